//! Item - publish payload
//!
//! A caller-assembled, multi-format message plus optional sequencing identifiers.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::PubControlError;

/// Named content-rendering capability
///
/// Each formatter contributes exactly one key to an exported message.
/// Implementations are supplied by collaborators (HTTP response, HTTP stream,
/// WebSocket message, ...); the publish core is agnostic to their content.
pub trait Formatter: Send + Sync {
    /// Key under which the exported value is placed
    fn name(&self) -> &str;

    /// Render the format payload
    fn export(&self) -> Value;
}

/// Flattened message produced by [`Item::export`]
///
/// Built fresh per publish call and never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExportedMessage(Map<String, Value>);

impl ExportedMessage {
    /// Attach the channel the message is published to
    pub fn set_channel(&mut self, channel: &str) {
        self.0
            .insert("channel".to_string(), Value::String(channel.to_string()));
    }

    /// Look up a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying JSON object
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Multi-format publish payload
///
/// Immutable once constructed. Formats are shared behind `Arc` so an item can be
/// cloned cheaply into concurrent publish branches.
#[derive(Clone, Default)]
pub struct Item {
    id: Option<String>,
    prev_id: Option<String>,
    formats: Vec<Arc<dyn Formatter>>,
}

impl Item {
    /// Create an item from a list of formats
    pub fn new(formats: Vec<Arc<dyn Formatter>>) -> Self {
        Self {
            id: None,
            prev_id: None,
            formats,
        }
    }

    /// Create an item carrying a single format
    pub fn single(format: impl Formatter + 'static) -> Self {
        Self::new(vec![Arc::new(format)])
    }

    /// Set the message ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the previous message ID
    pub fn with_prev_id(mut self, prev_id: impl Into<String>) -> Self {
        self.prev_id = Some(prev_id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn prev_id(&self) -> Option<&str> {
        self.prev_id.as_deref()
    }

    /// Names of the contained formats, in insertion order
    pub fn format_names(&self) -> Vec<&str> {
        self.formats.iter().map(|f| f.name()).collect()
    }

    /// Export into the flattened wire mapping
    ///
    /// Empty identifiers are omitted.
    ///
    /// # Errors
    /// `DuplicateFormat` if two formats report the same name, or a format
    /// uses one of the envelope keys (`id`, `prev-id`, `channel`)
    pub fn export(&self) -> Result<ExportedMessage, PubControlError> {
        let mut out = Map::new();
        if let Some(id) = self.id.as_deref().filter(|s| !s.is_empty()) {
            out.insert("id".to_string(), Value::String(id.to_string()));
        }
        if let Some(prev_id) = self.prev_id.as_deref().filter(|s| !s.is_empty()) {
            out.insert("prev-id".to_string(), Value::String(prev_id.to_string()));
        }

        let mut seen: HashSet<&str> = RESERVED_KEYS.into_iter().collect();
        for format in &self.formats {
            let name = format.name();
            if !seen.insert(name) {
                return Err(PubControlError::DuplicateFormat {
                    name: name.to_string(),
                });
            }
            out.insert(name.to_string(), format.export());
        }

        Ok(ExportedMessage(out))
    }
}

/// Keys owned by the message envelope, never by a format
const RESERVED_KEYS: [&str; 3] = ["id", "prev-id", "channel"];

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("prev_id", &self.prev_id)
            .field("formats", &self.format_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestFormat {
        name: &'static str,
        value: Value,
    }

    impl Formatter for TestFormat {
        fn name(&self) -> &str {
            self.name
        }

        fn export(&self) -> Value {
            self.value.clone()
        }
    }

    fn format(name: &'static str, value: Value) -> Arc<dyn Formatter> {
        Arc::new(TestFormat { name, value })
    }

    #[test]
    fn test_formatter_contract() {
        let fmt = TestFormat {
            name: "test-format",
            value: json!("value"),
        };
        assert_eq!(fmt.name(), "test-format");
        assert_eq!(fmt.export(), json!("value"));
    }

    #[test]
    fn test_export_with_ids() {
        let item = Item::new(vec![
            format("http-response", json!({"body": "hi"})),
            format("http-stream", json!({"content": "hi\n"})),
        ])
        .with_id("2")
        .with_prev_id("1");

        let exported = item.export().unwrap();
        assert_eq!(exported.len(), 4);
        assert_eq!(exported.get("id"), Some(&json!("2")));
        assert_eq!(exported.get("prev-id"), Some(&json!("1")));
        assert_eq!(exported.get("http-response"), Some(&json!({"body": "hi"})));
        assert_eq!(exported.get("http-stream"), Some(&json!({"content": "hi\n"})));
    }

    #[test]
    fn test_export_omits_empty_ids() {
        let item = Item::new(vec![format("a", json!(1))])
            .with_id("")
            .with_prev_id("");

        let exported = item.export().unwrap();
        assert_eq!(exported.len(), 1);
        assert!(exported.get("id").is_none());
        assert!(exported.get("prev-id").is_none());
    }

    #[test]
    fn test_export_duplicate_format_fails() {
        let item = Item::new(vec![format("same", json!(1)), format("same", json!(2))]);

        let err = item.export().unwrap_err();
        assert!(matches!(err, PubControlError::DuplicateFormat { ref name } if name == "same"));
    }

    #[test]
    fn test_export_rejects_envelope_keys() {
        for reserved in ["id", "prev-id", "channel"] {
            let item = Item::new(vec![format("a", json!(1)), format(reserved, json!("x"))]);
            let err = item.export().unwrap_err();
            assert!(matches!(err, PubControlError::DuplicateFormat { ref name } if name == reserved));
        }
    }

    #[test]
    fn test_export_is_repeatable() {
        let item = Item::single(TestFormat {
            name: "a",
            value: json!({"x": 1}),
        });
        assert_eq!(item.export().unwrap(), item.export().unwrap());
    }

    #[test]
    fn test_set_channel() {
        let mut exported = Item::new(vec![format("a", json!(1))]).export().unwrap();
        exported.set_channel("news");

        let value = serde_json::to_value(&exported).unwrap();
        assert_eq!(value, json!({"a": 1, "channel": "news"}));
    }
}
