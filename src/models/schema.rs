// Brick input/output schemas

//! # Brick Schemas
//!
//! Every registered brick declares a JSON-Schema-shaped input schema (and
//! optionally an output schema). The reducer validates resolved arguments
//! against the input schema before dispatching, so a brick implementation
//! can rely on the shape of what it receives. Schemas travel with brick
//! definitions and are surfaced to the editor UI for form generation, which
//! is why they carry a description and examples alongside the raw schema.

use serde::{Deserialize, Serialize};

/// JSON Schema definition for brick inputs/outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrickSchema {
    /// JSON Schema for validation
    pub schema: serde_json::Value,
    /// Human-readable description
    pub description: Option<String>,
    /// Example data matching this schema
    pub examples: Vec<serde_json::Value>,
}

impl BrickSchema {
    /// Create a schema from a JSON value.
    pub fn new(schema: serde_json::Value) -> Self {
        Self {
            schema,
            description: None,
            examples: Vec::new(),
        }
    }

    /// A permissive schema that accepts any argument object.
    ///
    /// Used by bricks whose config is free-form (e.g. identity/echo
    /// bricks) and by tests.
    pub fn empty() -> Self {
        Self::new(serde_json::json!({"type": "object"}))
    }

    /// Add a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an example.
    pub fn with_example(mut self, example: serde_json::Value) -> Self {
        self.examples.push(example);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let schema = BrickSchema::new(serde_json::json!({
            "type": "object",
            "required": ["message"],
            "properties": {"message": {"type": "string"}}
        }))
        .with_description("Show a message")
        .with_example(serde_json::json!({"message": "hello"}));

        assert_eq!(schema.description.as_deref(), Some("Show a message"));
        assert_eq!(schema.examples.len(), 1);
    }
}
