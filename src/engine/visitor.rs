// Pipeline tree visitor - shared traversal for analysis and linting

//! # Pipeline Tree Visitor
//!
//! A reusable traversal skeleton over a pipeline tree: bricks, the
//! sub-pipelines nested inside control-flow brick configs, and the
//! document renderer's element tree (whose element configs may embed
//! nested pipelines, e.g. a button's `onClick`). UI variable extraction,
//! pipeline analysis, and migration rewrites all implement
//! [`PipelineVisitor`] instead of duplicating traversal; the reducer
//! reuses the same position addressing for error attribution.
//!
//! ## Contract
//!
//! - [`PipelineVisitor::visit_brick`] fires once per step, in array order.
//! - [`PipelineVisitor::visit_expression`] fires for every expression
//!   found at any depth of a step's `if`/config values.
//! - [`PipelineVisitor::visit_literal`] fires for literal scalar leaves.
//! - Containers (objects/arrays) are entered, not reported: that is how
//!   pipelines embedded in a document element tree are found at their
//!   structural paths.
//! - A value that classifies as an expression but fails to parse is
//!   reported as a literal; rejecting it is resolution's job.
//!
//! Visitation order is deterministic (steps in array order, then each
//! step's fields in serialized order, nested structure interleaved), but
//! it is an *analysis* order: the reducer executes only the top-level
//! steps, strictly by index, and lets control-flow bricks drive their own
//! sub-pipelines.

use serde_json::Value;

use crate::engine::bricks::DOCUMENT_BRICK_ID;
use crate::models::expression::is_expression;
use crate::models::{BrickConfig, BrickPipeline, BrickPosition, Expression, RegistryId};

/// Whether a renderer (`return`-like) step is permitted in a pipeline.
///
/// Computed per sub-pipeline from the parent brick id and the config
/// field the sub-pipeline sits in, then threaded down the traversal so
/// both the reducer and any linter built on this visitor reject a
/// renderer brick placed where no surface exists to render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineFlavor {
    /// Renderer steps allowed (panel/sidebar surfaces).
    Renderer,
    /// Data/effect-only context; renderer steps are rejected.
    NoRenderer,
}

impl PipelineFlavor {
    /// Whether a renderer brick may run in this flavor.
    pub fn allows_renderer(&self) -> bool {
        matches!(self, PipelineFlavor::Renderer)
    }

    /// Flavor of a sub-pipeline nested in `_field` of the brick
    /// `parent_id`, given the surrounding pipeline's flavor.
    ///
    /// Document element handlers (button clicks etc.) run detached from
    /// the rendering surface, so they are never allowed to render;
    /// control-flow bricks simply extend the surrounding context.
    pub fn for_sub_pipeline(
        parent_id: &RegistryId,
        _field: &str,
        inherited: PipelineFlavor,
    ) -> PipelineFlavor {
        if parent_id.as_str() == DOCUMENT_BRICK_ID {
            PipelineFlavor::NoRenderer
        } else {
            inherited
        }
    }
}

/// Traversal override points. Every method defaults to a no-op, so
/// implementations opt into exactly the signals they need.
pub trait PipelineVisitor {
    /// Called once per step, before the step's fields are visited.
    fn visit_brick(
        &mut self,
        _position: &BrickPosition,
        _config: &BrickConfig,
        _flavor: PipelineFlavor,
    ) {
    }

    /// Called for every expression found in a step's `if` or config.
    fn visit_expression(&mut self, _position: &BrickPosition, _expression: &Expression) {}

    /// Called for every literal scalar leaf.
    fn visit_literal(&mut self, _position: &BrickPosition, _value: &Value) {}
}

/// Walk a pipeline tree, driving the visitor's override points.
///
/// `position` addresses the pipeline itself (use
/// [`BrickPosition::root`] for a mod component's root pipeline);
/// `flavor` is the pipeline's renderer policy.
pub fn walk_pipeline<V: PipelineVisitor + ?Sized>(
    visitor: &mut V,
    pipeline: &BrickPipeline,
    position: &BrickPosition,
    flavor: PipelineFlavor,
) {
    for (index, step) in pipeline.iter().enumerate() {
        let step_position = position.push_index(index);
        visitor.visit_brick(&step_position, step, flavor);

        if let Some(condition) = &step.condition {
            walk_value(
                visitor,
                condition,
                &step_position.push_field("if"),
                &step.id,
                "if",
                flavor,
            );
        }

        let config_base = step_position.push_field("config");
        for (field, value) in &step.config {
            walk_value(
                visitor,
                value,
                &config_base.push_field(field),
                &step.id,
                field,
                flavor,
            );
        }
    }
}

fn walk_value<V: PipelineVisitor + ?Sized>(
    visitor: &mut V,
    value: &Value,
    position: &BrickPosition,
    parent_id: &RegistryId,
    field: &str,
    flavor: PipelineFlavor,
) {
    if is_expression(value) {
        match Expression::from_value(value) {
            Ok(expression) => {
                visitor.visit_expression(position, &expression);
                match &expression {
                    Expression::Pipeline(inner) => {
                        let sub_flavor =
                            PipelineFlavor::for_sub_pipeline(parent_id, field, flavor);
                        walk_pipeline(
                            visitor,
                            inner,
                            &position.push_field("__value__"),
                            sub_flavor,
                        );
                    }
                    Expression::Defer(inner) => {
                        walk_value(
                            visitor,
                            inner,
                            &position.push_field("__value__"),
                            parent_id,
                            field,
                            flavor,
                        );
                    }
                    Expression::Var(_) | Expression::Nunjucks(_) => {}
                }
            }
            // Malformed shape: opaque to analysis, rejected at resolution
            Err(_) => visitor.visit_literal(position, value),
        }
        return;
    }

    match value {
        Value::Object(entries) => {
            for (key, entry) in entries {
                walk_value(
                    visitor,
                    entry,
                    &position.push_field(key),
                    parent_id,
                    key,
                    flavor,
                );
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk_value(
                    visitor,
                    item,
                    &position.push_index(index),
                    parent_id,
                    field,
                    flavor,
                );
            }
        }
        scalar => visitor.visit_literal(position, scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Collects every `var` reference with its position - the shape of
    /// the editor's variable-analysis pass.
    #[derive(Default)]
    struct VariableCollector {
        seen: Vec<(String, String)>,
    }

    impl PipelineVisitor for VariableCollector {
        fn visit_expression(&mut self, position: &BrickPosition, expression: &Expression) {
            if let Expression::Var(path) = expression {
                self.seen.push((position.to_string(), path.clone()));
            }
        }
    }

    #[derive(Default)]
    struct FlavorRecorder {
        bricks: Vec<(String, String, bool)>,
    }

    impl PipelineVisitor for FlavorRecorder {
        fn visit_brick(
            &mut self,
            position: &BrickPosition,
            config: &BrickConfig,
            flavor: PipelineFlavor,
        ) {
            self.bricks.push((
                position.to_string(),
                config.id.to_string(),
                flavor.allows_renderer(),
            ));
        }
    }

    fn document_pipeline() -> BrickPipeline {
        // A document renderer whose body embeds a button with an onClick
        // pipeline, plus a plain transform before it.
        serde_json::from_value(json!([
            {
                "id": "test/echo",
                "config": {"value": {"__type__": "var", "__value__": "@input.title"}}
            },
            {
                "id": "@bricks/document",
                "config": {
                    "body": [
                        {
                            "type": "button",
                            "config": {
                                "label": {"__type__": "nunjucks", "__value__": "{{ input.title }}"},
                                "onClick": {"__type__": "pipeline", "__value__": [
                                    {"id": "test/notify", "config": {"message": {"__type__": "var", "__value__": "@input.message"}}}
                                ]}
                            },
                            "children": []
                        }
                    ]
                }
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_collects_vars_at_structural_positions() {
        let mut collector = VariableCollector::default();
        walk_pipeline(
            &mut collector,
            &document_pipeline(),
            &BrickPosition::root(),
            PipelineFlavor::Renderer,
        );

        assert_eq!(
            collector.seen,
            vec![
                (
                    "pipeline.0.config.value".to_string(),
                    "@input.title".to_string()
                ),
                (
                    "pipeline.1.config.body.0.config.onClick.__value__.0.config.message"
                        .to_string(),
                    "@input.message".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_document_handlers_lose_renderer_flavor() {
        let mut recorder = FlavorRecorder::default();
        walk_pipeline(
            &mut recorder,
            &document_pipeline(),
            &BrickPosition::root(),
            PipelineFlavor::Renderer,
        );

        let by_id: std::collections::HashMap<_, _> = recorder
            .bricks
            .iter()
            .map(|(position, id, renderer_ok)| (id.clone(), (position.clone(), *renderer_ok)))
            .collect();

        // Root steps keep the renderer flavor
        assert!(by_id["test/echo"].1);
        assert!(by_id["@bricks/document"].1);
        // The onClick handler does not
        let (position, renderer_ok) = &by_id["test/notify"];
        assert!(!renderer_ok);
        assert_eq!(
            position,
            "pipeline.1.config.body.0.config.onClick.__value__.0"
        );
    }

    #[test]
    fn test_control_flow_inherits_flavor() {
        let pipeline: BrickPipeline = serde_json::from_value(json!([
            {
                "id": "@bricks/if-else",
                "config": {
                    "condition": true,
                    "if": {"__type__": "pipeline", "__value__": [
                        {"id": "test/render", "config": {}}
                    ]}
                }
            }
        ]))
        .unwrap();

        let mut recorder = FlavorRecorder::default();
        walk_pipeline(
            &mut recorder,
            &pipeline,
            &BrickPosition::root(),
            PipelineFlavor::Renderer,
        );
        // The branch body keeps the surrounding renderer permission
        assert!(recorder.bricks.iter().all(|(_, _, ok)| *ok));
    }

    #[test]
    fn test_defer_subtrees_are_entered() {
        let pipeline: BrickPipeline = serde_json::from_value(json!([
            {
                "id": "test/echo",
                "config": {
                    "template": {"__type__": "defer", "__value__": {
                        "field": {"__type__": "var", "__value__": "@element.name"}
                    }}
                }
            }
        ]))
        .unwrap();

        let mut collector = VariableCollector::default();
        walk_pipeline(
            &mut collector,
            &pipeline,
            &BrickPosition::root(),
            PipelineFlavor::NoRenderer,
        );
        assert_eq!(collector.seen.len(), 1);
        assert_eq!(collector.seen[0].1, "@element.name");
        assert_eq!(
            collector.seen[0].0,
            "pipeline.0.config.template.__value__.field"
        );
    }
}
