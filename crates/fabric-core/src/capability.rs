use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_modalities() -> Vec<String> {
    vec!["text".to_string()]
}

fn default_max_timeout_ms() -> u64 {
    60_000
}

/// A named, typed operation an agent or tool offers.
///
/// `name` is unique within the owning agent or tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default = "default_modalities")]
    pub modalities: Vec<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
    #[serde(default)]
    pub output_schema: Option<Value>,
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
}

impl Capability {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            streaming: false,
            modalities: default_modalities(),
            input_schema: None,
            output_schema: None,
            max_timeout_ms: default_max_timeout_ms(),
        }
    }

    pub fn streaming(mut self, value: bool) -> Self {
        self.streaming = value;
        self
    }

    pub fn with_timeout(mut self, max_timeout_ms: u64) -> Self {
        self.max_timeout_ms = max_timeout_ms;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
