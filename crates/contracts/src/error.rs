//! Layered error definitions
//!
//! Categorized by source: config / item / auth / transport / endpoint

use std::sync::Arc;

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum PubControlError {
    // ===== Configuration Errors =====
    /// Invalid endpoint entry
    #[error("config error: {message}")]
    Config { message: String },

    /// Configuration file parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Item Errors =====
    /// Two formats in one item report the same name
    #[error("duplicate format '{name}' in item")]
    DuplicateFormat { name: String },

    /// Wire body could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ===== Auth Errors =====
    /// Claims or key rejected while signing a token
    #[error("signing error: {message}")]
    Signing { message: String },

    // ===== Delivery Errors =====
    /// Network-level failure (DNS, refused connection, timeout)
    #[error("transport error for '{url}': {message}")]
    Transport {
        url: String,
        message: String,
        timeout: bool,
    },

    /// Endpoint answered with a non-2xx status
    #[error("Failure status code: {status} with message: {body}")]
    Publish { status: u16, body: String },

    /// Endpoint was never queued because an earlier one rejected the publish
    #[error("publish to '{url}' not attempted: {reason}")]
    NotAttempted { url: String, reason: String },

    /// Fan-out summary across endpoints
    #[error(
        "{failed}/{total} client(s) failed to publish to channel: {channel} Errors: [{}]",
        .errors.join("],[")
    )]
    Aggregate {
        failed: usize,
        total: usize,
        channel: String,
        errors: Vec<String>,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error shared by every callback of one delivered batch
pub type SharedError = Arc<PubControlError>;

impl PubControlError {
    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create signing error
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
            timeout: false,
        }
    }

    /// Create transport timeout error
    pub fn transport_timeout(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
            timeout: true,
        }
    }

    /// Create error for an endpoint skipped after an earlier rejection
    pub fn not_attempted(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotAttempted {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a non-2xx endpoint response
    pub fn is_publish(&self) -> bool {
        matches!(self, Self::Publish { .. })
    }

    /// Whether this is a network-level failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_message() {
        let err = PubControlError::Publish {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failure status code: 503 with message: unavailable"
        );
        assert!(err.is_publish());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_aggregate_error_message() {
        let err = PubControlError::Aggregate {
            failed: 2,
            total: 3,
            channel: "news".to_string(),
            errors: vec!["http://b: boom".to_string(), "http://c: PANIC: x".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "2/3 client(s) failed to publish to channel: news Errors: [http://b: boom],[http://c: PANIC: x]"
        );
    }

    #[test]
    fn test_transport_timeout_flag() {
        let err = PubControlError::transport_timeout("http://a/publish/", "timed out");
        assert!(matches!(err, PubControlError::Transport { timeout: true, .. }));
        assert!(err.is_transport());
    }

    #[test]
    fn test_not_attempted_message() {
        let err = PubControlError::not_attempted("http://c", "signing error: empty key");
        assert_eq!(
            err.to_string(),
            "publish to 'http://c' not attempted: signing error: empty key"
        );
    }
}
