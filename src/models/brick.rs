// Brick configurations and pipelines - the stored shape of mod logic

//! # Brick Configurations and Pipelines
//!
//! A mod component's logic is a [`BrickPipeline`]: an ordered sequence of
//! [`BrickConfig`] steps executed strictly left to right. Pipelines are
//! authored in the page editor, persisted as YAML/JSON inside mod
//! definitions, and handed to the reducer at run time - so the field names
//! here are a stable interface that must keep parsing across platform
//! versions.
//!
//! Step configs are **read-only values** during execution: the reducer
//! borrows them for the duration of a run and never mutates them. Any
//! expression resolution produces fresh values.
//!
//! ## Stored shape
//!
//! ```yaml
//! - id: "@bricks/for-each"
//!   config:
//!     elements:
//!       __type__: var
//!       __value__: "@input.rows"
//!     body:
//!       __type__: pipeline
//!       __value__:
//!         - id: "test/echo"
//!           config: { value: { __type__: var, __value__: "@element" } }
//!   outputKey: results
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::root::RootMode;

/// Stable identifier of a registered brick, e.g. `@bricks/if-else`.
///
/// Registry ids are plain strings by design: mod definitions reference
/// bricks by id long before (and long after) any particular runtime build,
/// so the id space stays open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryId(pub String);

impl RegistryId {
    /// Create a new registry id from any string-like input.
    pub fn new<S: Into<String>>(id: S) -> Self {
        RegistryId(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RegistryId {
    fn from(s: &str) -> Self {
        RegistryId(s.to_string())
    }
}

impl From<String> for RegistryId {
    fn from(s: String) -> Self {
        RegistryId(s)
    }
}

impl std::fmt::Display for RegistryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which browsing context a step's effect addresses.
///
/// Targeting is metadata for the starter-brick layer; the reducer forwards
/// it untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowTarget {
    /// The frame the pipeline is running in (the default).
    #[serde(rename = "self")]
    Current,
    /// The window that opened this one.
    Opener,
    /// The top-level frame.
    Top,
    /// All connected frames.
    Broadcast,
}

/// One step in a pipeline.
///
/// Constructed by the caller (UI or stored mod definition) before any run;
/// immutable during a single execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrickConfig {
    /// Registry id of the brick to invoke.
    pub id: RegistryId,

    /// Opaque unique identifier, stable across edits. Used for UI
    /// addressing and telemetry; not required for execution semantics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    /// Parameter name -> literal value or expression. Key order is
    /// irrelevant for execution but preserved for serialization.
    #[serde(default)]
    pub config: Map<String, Value>,

    /// Optional condition; the step is skipped when it resolves falsy.
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,

    /// Context variable (without the `@` sigil) that a transform/reader
    /// step's output is bound to for subsequent steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,

    /// How the step derives its effective root from the current root.
    #[serde(default, skip_serializing_if = "RootMode::is_inherit")]
    pub root_mode: RootMode,

    /// Selector for [`RootMode::Element`] narrowing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Browsing-context targeting metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowTarget>,
}

impl BrickConfig {
    /// Create a bare step for the given brick id.
    pub fn new<I: Into<RegistryId>>(id: I) -> Self {
        Self {
            id: id.into(),
            instance_id: None,
            config: Map::new(),
            condition: None,
            output_key: None,
            root_mode: RootMode::Inherit,
            root: None,
            window: None,
        }
    }

    /// Mint a fresh instance id for editor-created steps.
    pub fn with_new_instance_id(mut self) -> Self {
        self.instance_id = Some(Uuid::new_v4().to_string());
        self
    }

    /// Add a config entry.
    pub fn with_config_entry<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Set the step condition.
    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the output key the step's result is bound to.
    pub fn with_output_key<S: Into<String>>(mut self, key: S) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// Set root targeting for the step.
    pub fn with_root_mode(mut self, mode: RootMode, selector: Option<String>) -> Self {
        self.root_mode = mode;
        self.root = selector;
        self
    }
}

/// An ordered sequence of brick invocations.
///
/// Sequence matters: execution is strictly left to right and
/// non-restartable mid-sequence. A pipeline is either the root pipeline of
/// a mod component or a sub-pipeline nested inside a control-flow brick's
/// config (a loop body, a branch, a document element's click handler).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrickPipeline {
    pub steps: Vec<BrickConfig>,
}

impl BrickPipeline {
    /// Create a pipeline from steps.
    pub fn new(steps: Vec<BrickConfig>) -> Self {
        Self { steps }
    }

    /// Parse a pipeline from a JSON document (an array of steps).
    pub fn from_json(source: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Parse a pipeline from a YAML document (an array of steps), the
    /// format stored mod definitions use.
    pub fn from_yaml(source: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over the steps in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, BrickConfig> {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stored_shape_round_trip() {
        let raw = json!([{
            "id": "test/echo",
            "instanceId": "abc-123",
            "config": {"value": {"__type__": "var", "__value__": "@input.x"}},
            "if": {"__type__": "var", "__value__": "@input.enabled"},
            "outputKey": "out",
            "rootMode": "element",
            "root": "#panel"
        }]);

        let pipeline: BrickPipeline = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(pipeline.len(), 1);

        let step = &pipeline.steps[0];
        assert_eq!(step.id.as_str(), "test/echo");
        assert_eq!(step.instance_id.as_deref(), Some("abc-123"));
        assert_eq!(step.output_key.as_deref(), Some("out"));
        assert_eq!(step.root_mode, crate::models::RootMode::Element);

        let back = serde_json::to_value(&pipeline).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_defaults_are_omitted() {
        let step = BrickConfig::new("test/echo");
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value, json!({"id": "test/echo", "config": {}}));
    }

    #[test]
    fn test_from_json() {
        let pipeline =
            BrickPipeline::from_json(r#"[{"id": "test/echo", "config": {"value": 1}}]"#).unwrap();
        assert_eq!(pipeline.len(), 1);
        assert!(BrickPipeline::from_json("{\"not\": \"an array\"}").is_err());
    }

    #[test]
    fn test_from_yaml() {
        let pipeline = BrickPipeline::from_yaml(
            r#"
- id: "test/echo"
  config:
    value:
      __type__: var
      __value__: "@input.x"
  outputKey: out
"#,
        )
        .unwrap();
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.steps[0].output_key.as_deref(), Some("out"));
    }

    #[test]
    fn test_builder_helpers() {
        let step = BrickConfig::new("test/echo")
            .with_new_instance_id()
            .with_config_entry("value", json!(1))
            .with_condition(json!(true))
            .with_output_key("out")
            .with_root_mode(crate::models::RootMode::Element, Some("#app".to_string()));

        assert!(step.instance_id.is_some());
        assert_eq!(step.config["value"], json!(1));
        assert_eq!(step.output_key.as_deref(), Some("out"));
        assert_eq!(step.root.as_deref(), Some("#app"));
    }

    #[test]
    fn test_window_target_shape() {
        let target: WindowTarget = serde_json::from_str("\"self\"").unwrap();
        assert_eq!(target, WindowTarget::Current);
        let broadcast: WindowTarget = serde_json::from_str("\"broadcast\"").unwrap();
        assert_eq!(broadcast, WindowTarget::Broadcast);
    }
}
