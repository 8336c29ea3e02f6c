//! Wire form of a journey step.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// One element of the journey JSON array.
///
/// ```json
/// {"action":"ClickUI","args":{"role":"button","name":"Go"},"start":"+250ms"}
/// ```
///
/// `args` is kept as raw JSON text; the loader never looks inside it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Registry key.
    pub action: String,
    /// Opaque payload handed to the handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Box<RawValue>>,
    /// Start specifier (`"1500ms"`, `"+250ms"`, or absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}

impl ActionDescriptor {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            args: None,
            start: None,
        }
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Attaches an argument payload. Fails if `json` is not valid JSON.
    pub fn with_args(mut self, json: &str) -> Result<Self, serde_json::Error> {
        self.args = Some(RawValue::from_string(json.to_string())?);
        Ok(self)
    }
}
