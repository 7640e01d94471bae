//! ValueFormat - a formatter carrying a ready-made JSON value

use serde_json::Value;

use contracts::Formatter;

/// Formatter that exports a fixed JSON value under a given name
///
/// Useful when the payload for a format (e.g. `http-response`) has already
/// been rendered by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFormat {
    name: String,
    value: Value,
}

impl ValueFormat {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Formatter for ValueFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn export(&self) -> Value {
        self.value.clone()
    }
}
