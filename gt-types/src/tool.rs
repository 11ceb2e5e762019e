//! Tool definitions exposed to providers for function calling.

use serde::{Deserialize, Serialize};

/// A tool's name, description, and JSON-Schema parameter shape, in the
/// provider-agnostic form the agent loop builds once and each provider
/// adapter translates into its own wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name, used to dispatch calls in the registry.
    pub name: String,
    /// Short description shown to the model.
    pub description: String,
    /// JSON Schema object describing the tool's arguments.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Build a definition from its parts.
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
