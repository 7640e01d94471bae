//! Configuration validation
//!
//! Only file-level settings are fatal (`client.timeout_ms > 0`). Endpoint
//! entries are checked one by one: a broken entry is reported by
//! [`warnings`] and skipped when applied, so it cannot take the usable
//! entries down with it.

use contracts::{PubControlConfig, PubControlError};

/// Validate file-level settings
///
/// # Errors
/// `Config` if the client settings are unusable
pub fn validate(config: &PubControlConfig) -> Result<(), PubControlError> {
    if config.client.timeout_ms == 0 {
        return Err(PubControlError::config("client.timeout_ms must be > 0"));
    }
    Ok(())
}

/// Non-fatal observations, one line per affected entry
pub fn warnings(config: &PubControlConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.endpoints.is_empty() {
        warnings.push("no endpoints configured".to_string());
    }
    for (index, endpoint) in config.endpoints.iter().enumerate() {
        if let Err(e) = endpoint.check() {
            warnings.push(format!("endpoints[{index}]: {e}, entry will be skipped"));
            continue;
        }
        match endpoint.uri.as_deref() {
            None => warnings.push(format!("endpoints[{index}]: no uri, entry will be skipped")),
            Some(uri) if endpoint.key.is_none() => {
                warnings.push(format!("endpoints[{index}]: '{uri}' has no auth configured"))
            }
            Some(_) => {}
        }
    }
    warnings
}

/// Number of entries that will become clients
pub fn usable_endpoints(config: &PubControlConfig) -> usize {
    config
        .endpoints
        .iter()
        .filter(|e| e.uri.is_some() && e.check().is_ok())
        .count()
}
