//! Configuration parsing
//!
//! TOML is the primary format; JSON is accepted for parity with existing
//! endpoint lists.

use contracts::{PubControlConfig, PubControlError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<PubControlConfig, PubControlError> {
    toml::from_str(content).map_err(|e| PubControlError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<PubControlConfig, PubControlError> {
    serde_json::from_str(content).map_err(|e| PubControlError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<PubControlConfig, PubControlError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::KeyMaterial;

    #[test]
    fn test_parse_toml_endpoints() {
        let content = r#"
[client]
timeout_ms = 5000

[[endpoints]]
uri = "http://localhost:5561"
iss = "realm"
key = "secret"

[[endpoints]]
uri = "https://push.example.com"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.client.timeout_ms, 5000);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].iss.as_deref(), Some("realm"));
        assert_eq!(
            config.endpoints[0].key,
            Some(KeyMaterial::Text("secret".to_string()))
        );
        assert!(config.endpoints[1].key.is_none());
    }

    #[test]
    fn test_parse_json_byte_key() {
        let content = r#"{
            "endpoints": [
                { "uri": "http://a", "iss": "realm", "key": [115, 101, 99] },
                { "iss": "orphan" }
            ]
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(
            config.endpoints[0].key.as_ref().map(|k| k.as_bytes().to_vec()),
            Some(b"sec".to_vec())
        );
        assert!(config.endpoints[1].uri.is_none());
    }

    #[test]
    fn test_parse_empty_document() {
        let config = parse_toml("").unwrap();
        assert!(config.endpoints.is_empty());
        assert_eq!(config.client.timeout_ms, 30_000);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(PubControlError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
