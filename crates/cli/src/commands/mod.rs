//! Command implementations.

mod info;
mod publish;
mod validate;

pub use info::run_info;
pub use publish::run_publish;
pub use validate::run_validate;

use contracts::EndpointConfig;

/// Auth mode an endpoint entry selects when applied
fn auth_mode(entry: &EndpointConfig) -> &'static str {
    if entry.check().is_err() {
        return "invalid";
    }
    match (&entry.iss, &entry.key) {
        (Some(_), Some(_)) => "jwt",
        (None, Some(_)) => "bearer",
        (Some(_), None) => "invalid",
        (None, None) => "none",
    }
}
