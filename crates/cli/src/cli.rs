//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pubctl - publish items to pubcontrol endpoints
#[derive(Parser, Debug)]
#[command(
    name = "pubctl",
    author,
    version,
    about = "Publish items to one or more pubcontrol endpoints",
    long_about = "Publishes a single item to every endpoint listed in a configuration file.\n\n\
                  Endpoints are authenticated with JWT (iss + key) or a bearer token (key),\n\
                  and can be published to sequentially, in parallel or through the\n\
                  background batching queue."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PUBCTL_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "PUBCTL_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this port while the command runs
    #[arg(long, global = true, env = "PUBCTL_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Logging and metrics settings selected by the global flags
    pub fn observability_config(&self) -> observability::ObservabilityConfig {
        observability::ObservabilityConfig {
            log_format: self.log_format.into(),
            metrics_port: self.metrics_port,
            default_log_level: observability::level_for(self.verbose, self.quiet).to_string(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish one item to every configured endpoint
    Publish(PublishArgs),

    /// Validate configuration file without publishing
    Validate(ValidateArgs),

    /// Display configured endpoints
    Info(InfoArgs),
}

/// Arguments for the `publish` command
#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "pubcontrol.toml", env = "PUBCTL_CONFIG")]
    pub config: PathBuf,

    /// Channel to publish on
    #[arg(long)]
    pub channel: String,

    /// Format payload as a JSON document
    #[arg(long)]
    pub data: String,

    /// Format name the payload is exported under
    #[arg(long, default_value = "http-stream")]
    pub format: String,

    /// Item id
    #[arg(long)]
    pub id: Option<String>,

    /// Previous item id
    #[arg(long)]
    pub prev_id: Option<String>,

    /// How to fan out across endpoints
    #[arg(long, value_enum, default_value = "sequential")]
    pub mode: PublishMode,

    /// Print per-endpoint delivery counters after publishing
    #[arg(long)]
    pub stats: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pubcontrol.toml", env = "PUBCTL_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "pubcontrol.toml", env = "PUBCTL_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Fan-out strategy
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PublishMode {
    /// One endpoint after another, stop at the first failure
    #[default]
    Sequential,
    /// All endpoints at once, report every failure
    Parallel,
    /// Through each endpoint's background queue
    Async,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(value: LogFormat) -> Self {
        match value {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
