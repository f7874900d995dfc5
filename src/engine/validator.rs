// Schema validator - gates resolved args before brick dispatch

//! # Schema Validator
//!
//! Validates a resolved argument object against a brick's declared input
//! schema (and, optionally, a brick's output against its output schema
//! after invocation). Validation is a pure function: it never coerces or
//! repairs the input, and a passing validation has no observable effect.
//!
//! Violations are reported in JSON-Schema output terms - `keywordLocation`
//! (path into the schema), `instanceLocation` (path into the data), and a
//! human-readable message - so a developer-facing detail view can
//! reconstruct "what was sent vs. what was expected" without re-running
//! the pipeline.

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One schema violation, in JSON-Schema output format terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaViolation {
    /// Path into the schema that rejected the value, e.g.
    /// `#/properties/message/type`.
    pub keyword_location: String,
    /// Path into the validated data, e.g. `#/message`.
    pub instance_location: String,
    /// Human-readable description of the violation.
    pub error: String,
}

/// Validate an instance against a JSON-Schema-shaped schema.
///
/// Returns the (possibly empty) violation list. An unparseable schema is
/// reported as a single violation at the schema root rather than a crash:
/// stored mod definitions can carry schemas this build does not fully
/// understand, and the author needs a pointer, not a panic.
pub fn validate(schema: &Value, instance: &Value) -> Vec<SchemaViolation> {
    let compiled = match JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(error) => {
            return vec![SchemaViolation {
                keyword_location: format!("#{}", error.schema_path),
                instance_location: "#".to_string(),
                error: format!("Invalid schema: {}", error),
            }];
        }
    };

    let violations = match compiled.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|error| SchemaViolation {
                keyword_location: format!("#{}", error.schema_path),
                instance_location: format!("#{}", error.instance_path),
                error: error.to_string(),
            })
            .collect(),
    };
    violations
}

/// Whether the instance satisfies the schema.
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    validate(schema, instance).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_schema() -> Value {
        json!({
            "type": "object",
            "required": ["message"],
            "properties": {"message": {"type": "string"}}
        })
    }

    #[test]
    fn test_passing_instance_has_no_violations() {
        let violations = validate(&message_schema(), &json!({"message": "hello"}));
        assert!(violations.is_empty());
    }

    #[test]
    fn test_type_violation_locations() {
        let violations = validate(&message_schema(), &json!({"message": {"nested": true}}));
        assert_eq!(violations.len(), 1);
        assert!(violations[0]
            .keyword_location
            .starts_with("#/properties/message"));
        assert_eq!(violations[0].instance_location, "#/message");
    }

    #[test]
    fn test_missing_required_property() {
        let violations = validate(&message_schema(), &json!({}));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].keyword_location.contains("required"));
        assert_eq!(violations[0].instance_location, "#");
    }

    #[test]
    fn test_validation_does_not_coerce() {
        // "42" is not coerced to a number; the violation surfaces instead
        let schema = json!({
            "type": "object",
            "properties": {"count": {"type": "number"}}
        });
        let instance = json!({"count": "42"});
        assert!(!is_valid(&schema, &instance));
        assert_eq!(instance, json!({"count": "42"}));
    }

    #[test]
    fn test_type_union_and_enum() {
        let schema = json!({
            "type": "object",
            "properties": {
                "target": {"type": ["string", "null"]},
                "mode": {"enum": ["append", "replace"]}
            }
        });
        assert!(is_valid(&schema, &json!({"target": null, "mode": "append"})));
        assert!(!is_valid(&schema, &json!({"mode": "prepend"})));
    }

    #[test]
    fn test_invalid_schema_reports_instead_of_panicking() {
        let violations = validate(&json!({"type": "no-such-type"}), &json!({}));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].error.contains("Invalid schema"));
    }
}
