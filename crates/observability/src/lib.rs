//! # Observability
//!
//! Logging and metrics plumbing for the publisher crates and `pubctl`.
//!
//! One call to [`init_with_config`] installs a single `tracing` subscriber
//! whose output format is picked at runtime, and, when a port is given,
//! a Prometheus recorder serving `/metrics`. The publish counters recorded
//! through [`metrics`] are no-ops until that recorder exists.
//!
//! ```ignore
//! use observability::{init_with_config, level_for, LogFormat, ObservabilityConfig};
//!
//! init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: Some(9898),
//!     default_log_level: level_for(1, false).to_string(),
//! })?;
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

pub use crate::metrics::{record_batch, record_fanout, record_publish, record_queue_depth};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// JSON logs at `info`, no metrics listener
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Logging and metrics settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Port for the Prometheus listener, disabled when `None`
    pub metrics_port: Option<u16>,
    /// Directive used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Listener address of the Prometheus exporter, if enabled
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_port
            .map(|port| SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, for reading during development
    Pretty,
    /// One line per event, on stderr
    Compact,
}

/// Default level for a verbosity count and quiet flag
///
/// `quiet` wins over any verbosity.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Install the global subscriber and, if configured, the metrics exporter
///
/// # Errors
/// Fails if a global subscriber or recorder is already installed, or the
/// metrics port cannot be bound.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    tracing_subscriber::registry()
        .with(output_layer(config.log_format, filter))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(addr) = config.metrics_addr() {
        install_prometheus(addr)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics = ?config.metrics_addr(),
        "Observability initialized"
    );
    Ok(())
}

/// Serve Prometheus metrics on `port` without touching the subscriber
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
}

fn output_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_filter(filter).boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start Prometheus exporter on {addr}"))?;

    tracing::info!(%addr, "Serving Prometheus metrics");
    Ok(())
}
