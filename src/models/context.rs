// Execution context - per-run variable state

//! # Execution Context
//!
//! Ephemeral, per-run state the resolver reads variables from. Each reducer
//! invocation constructs its own context; contexts are never shared across
//! concurrent runs. Bricks never mutate the context directly - the only
//! mutations are the reducer binding a step's `outputKey` and explicit
//! narrowing when descending into a sub-pipeline (a loop iteration
//! rebinding its element variable, a document handler rebinding `root`).

use serde_json::{Map, Value};

use super::root::ElementRef;

/// Per-run execution state: reader input, integration bindings, mod
/// options, the current root, and output-key bindings from earlier steps.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Reader/event data supplied by the starter brick (`@input`).
    pub input: Value,
    /// Resolved service/integration bindings, keyed without the `@` sigil.
    pub integration_context: Map<String, Value>,
    /// Mod-level configuration (`@options`).
    pub options_args: Map<String, Value>,
    /// Current DOM targeting scope.
    pub root: ElementRef,
    /// Output-key bindings from earlier steps, keyed without the `@` sigil.
    bindings: Map<String, Value>,
}

impl ExecutionContext {
    /// Construct the context for a fresh run.
    pub fn new(
        input: Value,
        integration_context: Map<String, Value>,
        options_args: Map<String, Value>,
        root: ElementRef,
    ) -> Self {
        Self {
            input,
            integration_context,
            options_args,
            root,
            bindings: Map::new(),
        }
    }

    /// Bind a step's output under its output key.
    ///
    /// The key is the raw `outputKey` (no sigil); later steps address it as
    /// `@key`.
    pub fn bind_output<S: Into<String>>(&mut self, key: S, value: Value) {
        self.bindings.insert(key.into(), value);
    }

    /// A copy of this context with a different root, for sub-pipeline
    /// recursion that overrides targeting.
    pub fn with_root(&self, root: ElementRef) -> Self {
        let mut narrowed = self.clone();
        narrowed.root = root;
        narrowed
    }

    /// A copy of this context with different input, for sub-pipeline
    /// recursion that rebinds reader data.
    pub fn with_input(&self, input: Value) -> Self {
        let mut narrowed = self.clone();
        narrowed.input = input;
        narrowed
    }

    /// The bound value for an output key, if any.
    pub fn binding(&self, key: &str) -> Option<&Value> {
        self.bindings.get(key)
    }

    /// The merged variable table `var` expressions resolve against, keyed
    /// with the `@` sigil.
    ///
    /// Merge precedence on name collision, lowest to highest:
    /// integration-context bindings, then `@input`, then `@options`, then
    /// output-key bindings. An explicit `outputKey` always shadows ambient
    /// bindings, and the reserved `@input`/`@options` names can never be
    /// masked by an integration binding.
    pub fn variable_table(&self) -> Map<String, Value> {
        let mut table = Map::new();
        for (key, value) in &self.integration_context {
            table.insert(format!("@{}", key), value.clone());
        }
        table.insert("@input".to_string(), self.input.clone());
        table.insert(
            "@options".to_string(),
            Value::Object(self.options_args.clone()),
        );
        for (key, value) in &self.bindings {
            table.insert(format!("@{}", key), value.clone());
        }
        table
    }

    /// The same merged table without the `@` sigil, for template
    /// rendering (template identifiers cannot start with `@`).
    pub fn template_table(&self) -> Map<String, Value> {
        let mut table = Map::new();
        for (key, value) in &self.integration_context {
            table.insert(key.clone(), value.clone());
        }
        table.insert("input".to_string(), self.input.clone());
        table.insert(
            "options".to_string(),
            Value::Object(self.options_args.clone()),
        );
        for (key, value) in &self.bindings {
            table.insert(key.clone(), value.clone());
        }
        table
    }
}
