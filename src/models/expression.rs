// Expression model - deferred, serializable config values

//! # Expression Model
//!
//! A brick's config entries are either plain JSON literals or
//! **expressions**: deferred references that the runtime resolves against
//! the execution context when the step runs. Expressions are persisted as
//! part of stored mod definitions, so their on-disk shape is a stable
//! interface - exactly two keys:
//!
//! ```json
//! { "__type__": "var", "__value__": "@input.title" }
//! ```
//!
//! The four variants:
//!
//! - `var` - a single `@`-prefixed path looked up in the variable table
//! - `nunjucks` - a text template rendered against the variable table
//! - `pipeline` - a nested [`BrickPipeline`] passed to a control-flow or
//!   document brick as a callback body; never resolved eagerly
//! - `defer` - an arbitrary sub-tree resolved lazily, only when the
//!   consuming brick explicitly asks for it
//!
//! Classification is **total and infallible**: the predicates below decide
//! literal vs. expression for any JSON value without ever failing. A value
//! that carries the `__type__` tag but a malformed `__value__` still
//! *classifies* as an expression - it is rejected later, by
//! [`Expression::from_value`] during resolution, where the error can be
//! attributed to a pipeline position.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::brick::BrickPipeline;

/// Key carrying the expression type tag in the serialized form.
pub const TYPE_KEY: &str = "__type__";
/// Key carrying the expression payload in the serialized form.
pub const VALUE_KEY: &str = "__value__";

/// The known expression type tags, in serialized form.
const KNOWN_TAGS: [&str; 4] = ["var", "nunjucks", "pipeline", "defer"];

/// A deferred, serializable config value.
///
/// The serde representation is adjacently tagged on `__type__` /
/// `__value__`, which round-trips byte-for-byte with the stored shape:
///
/// ```rust
/// use brick_runtime::models::Expression;
///
/// let expression = Expression::Var("@input.title".to_string());
/// let json = serde_json::to_value(&expression).unwrap();
/// assert_eq!(
///     json,
///     serde_json::json!({"__type__": "var", "__value__": "@input.title"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__", content = "__value__", rename_all = "lowercase")]
pub enum Expression {
    /// Variable reference: `@name` or `@name.sub.path`. A trailing `?` on a
    /// path segment makes that segment null-coalescing.
    Var(String),
    /// Text template rendered against the variable table.
    Nunjucks(String),
    /// Nested pipeline used as a callback body (loop body, branch,
    /// document element handler). The expression exclusively owns the
    /// nested definition.
    Pipeline(BrickPipeline),
    /// Arbitrary sub-tree resolved lazily by the consuming brick.
    Defer(Value),
}

impl Expression {
    /// Create a `var` expression.
    pub fn var<S: Into<String>>(path: S) -> Self {
        Expression::Var(path.into())
    }

    /// Create a `nunjucks` template expression.
    pub fn template<S: Into<String>>(template: S) -> Self {
        Expression::Nunjucks(template.into())
    }

    /// Create a `pipeline` expression from a sequence of steps.
    pub fn pipeline(pipeline: BrickPipeline) -> Self {
        Expression::Pipeline(pipeline)
    }

    /// The serialized type tag of this expression.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Expression::Var(_) => "var",
            Expression::Nunjucks(_) => "nunjucks",
            Expression::Pipeline(_) => "pipeline",
            Expression::Defer(_) => "defer",
        }
    }

    /// Parse an expression-shaped JSON value into a typed expression.
    ///
    /// This is the fallible counterpart to the classification predicates:
    /// call it only on values for which [`is_expression`] returned `true`.
    /// A known tag with a malformed payload (e.g. a numeric `__value__` on
    /// a `var`) is rejected here with a description of the mismatch.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())
    }

    /// Serialize back to the two-key tagged JSON shape.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("expression serialization is infallible")
    }
}

/// Is this value an expression (any of the four variants)?
///
/// True exactly when the value is an object whose `__type__` key holds one
/// of the known tags. Never fails; malformed payloads under a known tag
/// still classify as expressions and are rejected at resolution time.
pub fn is_expression(value: &Value) -> bool {
    match value.get(TYPE_KEY).and_then(Value::as_str) {
        Some(tag) => KNOWN_TAGS.contains(&tag),
        None => false,
    }
}

/// Is this value a `var` expression?
pub fn is_var_expression(value: &Value) -> bool {
    has_tag(value, "var")
}

/// Is this value a `nunjucks` template expression?
pub fn is_template_expression(value: &Value) -> bool {
    has_tag(value, "nunjucks")
}

/// Is this value a `pipeline` expression?
pub fn is_pipeline_expression(value: &Value) -> bool {
    has_tag(value, "pipeline")
}

/// Is this value a `defer` expression?
pub fn is_defer_expression(value: &Value) -> bool {
    has_tag(value, "defer")
}

fn has_tag(value: &Value, tag: &str) -> bool {
    value.get(TYPE_KEY).and_then(Value::as_str) == Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BrickConfig;
    use serde_json::json;

    #[test]
    fn test_on_disk_shape_round_trip() {
        let cases = vec![
            json!({"__type__": "var", "__value__": "@input.x"}),
            json!({"__type__": "nunjucks", "__value__": "Hello {{ input.name }}"}),
            json!({"__type__": "pipeline", "__value__": []}),
            json!({"__type__": "defer", "__value__": {"nested": {"__type__": "var", "__value__": "@element"}}}),
        ];

        for case in cases {
            let expression = Expression::from_value(&case).unwrap();
            let back = expression.to_value();
            assert_eq!(back, case);
            // Classification of the round-tripped value is identical
            assert!(is_expression(&back));
            assert_eq!(
                back.get(TYPE_KEY).unwrap().as_str().unwrap(),
                expression.type_tag()
            );
        }
    }

    #[test]
    fn test_classification_is_total() {
        // None of these are expressions, and none of the calls fail
        assert!(!is_expression(&json!(null)));
        assert!(!is_expression(&json!(42)));
        assert!(!is_expression(&json!("@input.x")));
        assert!(!is_expression(&json!({"id": "test/brick"})));
        assert!(!is_expression(&json!({"__type__": "bogus", "__value__": 1})));
        assert!(!is_expression(&json!({"__type__": 42})));
        assert!(!is_expression(&json!([{"__type__": "var"}])));
    }

    #[test]
    fn test_malformed_expression_classifies_but_fails_parsing() {
        // Known tag, payload of the wrong shape: classification says
        // "expression", parsing says why it is unusable.
        let malformed = json!({"__type__": "var", "__value__": 42});
        assert!(is_expression(&malformed));
        assert!(is_var_expression(&malformed));
        assert!(Expression::from_value(&malformed).is_err());
    }

    #[test]
    fn test_variant_predicates() {
        let var = json!({"__type__": "var", "__value__": "@x"});
        let template = json!({"__type__": "nunjucks", "__value__": "{{ x }}"});
        assert!(is_var_expression(&var) && !is_template_expression(&var));
        assert!(is_template_expression(&template) && !is_var_expression(&template));
    }

    #[test]
    fn test_pipeline_expression_owns_steps() {
        let pipeline = BrickPipeline::new(vec![BrickConfig::new("test/echo")]);
        let expression = Expression::pipeline(pipeline);
        let value = expression.to_value();
        assert!(is_pipeline_expression(&value));

        let parsed = Expression::from_value(&value).unwrap();
        match parsed {
            Expression::Pipeline(inner) => assert_eq!(inner.len(), 1),
            other => panic!("expected pipeline expression, got {:?}", other),
        }
    }
}
