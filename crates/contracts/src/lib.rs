//! # Contracts
//!
//! Frozen interface contracts shared by every publishing crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Publish model
//! - An [`Item`] aggregates one or more named [`Formatter`]s plus optional
//!   `id` / `prev-id` sequencing identifiers
//! - [`Item::export`] flattens it into an [`ExportedMessage`], which is what
//!   travels on the wire inside `{"items": [...]}`
//! - The HTTP call itself sits behind the [`Transport`] seam

mod config;
mod error;
mod item;
mod transport;

pub use config::*;
pub use error::*;
pub use item::*;
pub use transport::*;
