//! # PubControl
//!
//! Publish-side client for HTTP pub/sub gateways.
//!
//! Responsibilities:
//! - Deliver an [`Item`] to one endpoint, inline or through a batching
//!   background worker ([`EndpointClient`])
//! - Fan one publish out to every configured endpoint, isolating failures
//!   per endpoint ([`PubControl`])
//! - Collapse per-endpoint completions into one callback
//!   ([`CallbackAggregator`])
//!
//! ```no_run
//! use pubcontrol::{EndpointConfig, Item, PubControl, PubControlConfig, ValueFormat};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), pubcontrol::PubControlError> {
//! let config = PubControlConfig {
//!     endpoints: vec![EndpointConfig::jwt("http://localhost:5561", "realm", "secret")],
//!     ..Default::default()
//! };
//! let control = PubControl::new(&config)?;
//! let item = Item::single(ValueFormat::new("http-stream", json!({"content": "hello\n"})));
//! control.publish_parallel("news", &item).await?;
//! control.finish().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod callback;
pub mod client;
pub mod format;
pub mod handle;
pub mod http;
pub mod metrics;
pub mod pubcontrol;

#[cfg(test)]
mod mock;

pub use auth::{AuthMode, Claims};
pub use callback::CallbackAggregator;
pub use client::EndpointClient;
pub use contracts::{
    ClientSettings, EndpointConfig, ExportedMessage, Formatter, Item, KeyMaterial,
    PubControlConfig, PubControlError, SharedError, Transport, TransportRequest,
    TransportResponse,
};
pub use format::ValueFormat;
pub use handle::{PublishCallback, MAX_BATCH_SIZE};
pub use http::HttpTransport;
pub use metrics::{EndpointMetrics, MetricsSnapshot};
pub use pubcontrol::PubControl;
