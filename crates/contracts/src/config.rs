//! PubControlConfig - declarative endpoint configuration
//!
//! Describes the HTTP client settings and the list of publish endpoints.

use serde::{Deserialize, Serialize};

use crate::error::PubControlError;

/// Complete publisher configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubControlConfig {
    /// HTTP client settings
    #[serde(default)]
    pub client: ClientSettings,

    /// Endpoint entries, in registration order
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// HTTP client settings shared by every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User agent sent with every publish
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    concat!("pubcontrol-rs/", env!("CARGO_PKG_VERSION")).to_string()
}

/// One endpoint entry
///
/// Unknown keys are ignored; an entry without `uri` is skipped when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint base URI (`/publish/` is appended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// JWT issuer; selects JWT auth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// JWT signing key, or a pre-shared bearer token when `iss` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyMaterial>,
}

impl EndpointConfig {
    /// Entry with only a URI
    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// Entry configured for JWT auth
    pub fn jwt(uri: impl Into<String>, iss: impl Into<String>, key: impl Into<KeyMaterial>) -> Self {
        Self {
            uri: Some(uri.into()),
            iss: Some(iss.into()),
            key: Some(key.into()),
        }
    }

    /// Check that this entry can build a client
    ///
    /// Entries without a URI pass; they are skipped when applied.
    ///
    /// # Errors
    /// `Config` describing the first problem found
    pub fn check(&self) -> Result<(), PubControlError> {
        if let Some(uri) = self.uri.as_deref() {
            if uri.is_empty() {
                return Err(PubControlError::config("uri is empty"));
            }
            if !(uri.starts_with("http://") || uri.starts_with("https://")) {
                return Err(PubControlError::config(format!(
                    "uri must be http or https, got '{uri}'"
                )));
            }
        }
        if self.iss.is_some() && self.key.is_none() {
            return Err(PubControlError::config("'iss' requires a 'key'"));
        }
        if self.key.as_ref().is_some_and(KeyMaterial::is_empty) {
            return Err(PubControlError::config("key is empty"));
        }
        Ok(())
    }
}

/// Key given either as text or raw bytes
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyMaterial {
    Text(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl KeyMaterial {
    /// Key bytes, regardless of representation
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

// Never print key material.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(_) => f.write_str("KeyMaterial::Text(<redacted>)"),
            Self::Bytes(b) => write!(f, "KeyMaterial::Bytes(<{} bytes redacted>)", b.len()),
        }
    }
}

impl From<&str> for KeyMaterial {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KeyMaterial {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for KeyMaterial {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}
