//! Function-calling descriptors passed to the model.

use serde::{Deserialize, Serialize};

/// One callable tool as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Unique name within a merged catalog; `[A-Za-z0-9_]+`.
    pub name: String,
    /// One-sentence instruction for the model.
    pub description: String,
    /// JSON-Schema-shaped argument description.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
