// Built-in bricks - control flow, identity, and the document renderer

//! # Built-in Bricks
//!
//! The minimal standard brick set every registry starts from (via
//! [`BrickRegistry::with_builtin_bricks`](crate::BrickRegistry::with_builtin_bricks)).
//! The control-flow bricks are where iteration and recovery policy lives:
//! the reducer knows nothing about loops or branches, it only supplies the
//! [`BrickOptions::run_pipeline`] recursion primitive these bricks call
//! with their own narrowed contexts.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::reducer::{BrickOptions, RunOutcome};
use crate::engine::registry::{Brick, BrickKind};
use crate::engine::resolver;
use crate::models::{BrickSchema, RegistryId};
use crate::{BrickRuntimeError, Result};

/// Registry id of the document renderer, special-cased by the tree
/// visitor (its `body` embeds element trees with nested pipelines).
pub const DOCUMENT_BRICK_ID: &str = "@bricks/document";

/// The standard brick set.
pub fn builtin_bricks() -> Vec<Arc<dyn Brick>> {
    vec![
        Arc::new(IdentityBrick),
        Arc::new(IfElseBrick),
        Arc::new(ForEachBrick),
        Arc::new(TryCatchBrick),
        Arc::new(DocumentBrick),
    ]
}

/// Transform that echoes its resolved args. The simplest possible brick;
/// useful for rewiring values between output keys and in demos/tests.
#[derive(Debug)]
pub struct IdentityBrick;

#[async_trait]
impl Brick for IdentityBrick {
    fn id(&self) -> RegistryId {
        RegistryId::from("@bricks/identity")
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn input_schema(&self) -> BrickSchema {
        BrickSchema::empty().with_description("Echo the resolved arguments")
    }

    async fn run(&self, args: Value, _options: &BrickOptions<'_>) -> Result<RunOutcome> {
        Ok(RunOutcome::Completed(args))
    }
}

/// Conditional branch: runs the `if` pipeline when `condition` is truthy,
/// the `else` pipeline otherwise. A missing branch completes with null.
#[derive(Debug)]
pub struct IfElseBrick;

#[async_trait]
impl Brick for IfElseBrick {
    fn id(&self) -> RegistryId {
        RegistryId::from("@bricks/if-else")
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn input_schema(&self) -> BrickSchema {
        BrickSchema::new(json!({
            "type": "object",
            "required": ["condition"],
            "properties": {
                "condition": {"description": "Branch selector; coerced to a boolean"},
                "if": {"description": "Pipeline to run when the condition is truthy"},
                "else": {"description": "Pipeline to run when the condition is falsy"}
            }
        }))
        .with_description("Run one of two sub-pipelines based on a condition")
    }

    async fn run(&self, args: Value, options: &BrickOptions<'_>) -> Result<RunOutcome> {
        options.ensure_active()?;
        let truthy = resolver::is_truthy(args.get("condition").unwrap_or(&Value::Null));
        let field = if truthy { "if" } else { "else" };

        match args.get(field) {
            Some(branch) => {
                options
                    .run_pipeline(field, branch, options.ctxt.clone())
                    .await
            }
            None => Ok(RunOutcome::Completed(Value::Null)),
        }
    }
}

/// For-each loop: runs the `body` pipeline once per element of
/// `elements`, binding the current element into the iteration's context
/// (under `elementKey`, default `element`). Completes with the array of
/// per-iteration results; a suspension inside any iteration suspends the
/// whole loop.
#[derive(Debug)]
pub struct ForEachBrick;

#[async_trait]
impl Brick for ForEachBrick {
    fn id(&self) -> RegistryId {
        RegistryId::from("@bricks/for-each")
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn input_schema(&self) -> BrickSchema {
        BrickSchema::new(json!({
            "type": "object",
            "required": ["elements", "body"],
            "properties": {
                "elements": {"type": "array", "description": "Values to iterate over"},
                "body": {"description": "Pipeline to run per element"},
                "elementKey": {
                    "type": "string",
                    "description": "Context variable the current element is bound to",
                    "default": "element"
                }
            }
        }))
        .with_description("Run a sub-pipeline once per element")
    }

    async fn run(&self, args: Value, options: &BrickOptions<'_>) -> Result<RunOutcome> {
        let elements = args
            .get("elements")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let body = args.get("body").cloned().unwrap_or(Value::Null);
        let element_key = args
            .get("elementKey")
            .and_then(Value::as_str)
            .unwrap_or("element");

        let mut outputs = Vec::with_capacity(elements.len());
        for element in elements {
            options.ensure_active()?;

            // Fresh narrowed context per iteration: the loop variable is
            // a binding, not a mutation of the surrounding context
            let mut iteration_ctxt = options.ctxt.clone();
            iteration_ctxt.bind_output(element_key, element);

            match options.run_pipeline("body", &body, iteration_ctxt).await? {
                RunOutcome::Completed(value) => outputs.push(value),
                suspended @ RunOutcome::Suspended(_) => return Ok(suspended),
            }
        }

        Ok(RunOutcome::Completed(Value::Array(outputs)))
    }
}

/// The sanctioned recovery point: runs the `try` pipeline and, when it
/// fails, the `catch` pipeline with the failure bound as `@error`.
/// Aborts are never caught - cancellation must terminate the run.
#[derive(Debug)]
pub struct TryCatchBrick;

#[async_trait]
impl Brick for TryCatchBrick {
    fn id(&self) -> RegistryId {
        RegistryId::from("@bricks/try-catch")
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn input_schema(&self) -> BrickSchema {
        BrickSchema::new(json!({
            "type": "object",
            "required": ["try"],
            "properties": {
                "try": {"description": "Pipeline to attempt"},
                "catch": {"description": "Pipeline to run when the attempt fails"}
            }
        }))
        .with_description("Attempt a sub-pipeline, recovering from failure")
    }

    async fn run(&self, args: Value, options: &BrickOptions<'_>) -> Result<RunOutcome> {
        options.ensure_active()?;
        let attempt = args.get("try").cloned().unwrap_or(Value::Null);

        match options
            .run_pipeline("try", &attempt, options.ctxt.clone())
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(error @ BrickRuntimeError::Aborted) => Err(error),
            Err(error) => match args.get("catch") {
                Some(recovery) => {
                    let mut recovery_ctxt = options.ctxt.clone();
                    recovery_ctxt.bind_output(
                        "error",
                        json!({
                            "message": error.to_string(),
                            "expected": error.is_expected()
                        }),
                    );
                    options
                        .run_pipeline("catch", recovery, recovery_ctxt)
                        .await
                }
                None => Ok(RunOutcome::Completed(Value::Null)),
            },
        }
    }
}

/// The document renderer: its `body` is a tree of UI elements whose
/// configs may embed nested pipelines (button handlers etc.). In headless
/// runs the reducer suspends before invoking it; invoked directly (a
/// non-headless panel run), it completes with the resolved body as the
/// render payload.
#[derive(Debug)]
pub struct DocumentBrick;

#[async_trait]
impl Brick for DocumentBrick {
    fn id(&self) -> RegistryId {
        RegistryId::from(DOCUMENT_BRICK_ID)
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Renderer
    }

    fn input_schema(&self) -> BrickSchema {
        BrickSchema::new(json!({
            "type": "object",
            "required": ["body"],
            "properties": {
                "body": {"type": "array", "description": "Document element tree"}
            }
        }))
        .with_description("Render a document element tree into a panel surface")
    }

    fn output_schema(&self) -> Option<BrickSchema> {
        Some(BrickSchema::new(json!({
            "type": "object",
            "required": ["body"]
        })))
    }

    async fn run(&self, args: Value, options: &BrickOptions<'_>) -> Result<RunOutcome> {
        options.ensure_active()?;
        Ok(RunOutcome::Completed(args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reducer::{InitialValues, PipelineReducer, RunOptions};
    use crate::engine::registry::BrickRegistry;
    use crate::engine::visitor::PipelineFlavor;
    use crate::models::BrickPipeline;

    fn reducer() -> PipelineReducer {
        PipelineReducer::new(Arc::new(BrickRegistry::with_builtin_bricks()))
    }

    fn pipeline(raw: Value) -> BrickPipeline {
        serde_json::from_value(raw).unwrap()
    }

    fn echo_step(value: Value) -> Value {
        json!({"id": "@bricks/identity", "config": {"value": value}})
    }

    #[tokio::test]
    async fn test_if_else_takes_the_right_branch() {
        let reducer = reducer();
        for (enabled, expected) in [(true, "yes"), (false, "no")] {
            let definition = pipeline(json!([
                {
                    "id": "@bricks/if-else",
                    "config": {
                        "condition": {"__type__": "var", "__value__": "@input.enabled"},
                        "if": {"__type__": "pipeline", "__value__": [echo_step(json!("yes"))]},
                        "else": {"__type__": "pipeline", "__value__": [echo_step(json!("no"))]}
                    }
                }
            ]));

            let outcome = reducer
                .reduce_pipeline(
                    &definition,
                    InitialValues::with_input(json!({"enabled": enabled})),
                    &RunOptions::default(),
                )
                .await
                .unwrap();
            assert_eq!(
                outcome.into_value().unwrap(),
                json!({"value": expected}),
                "enabled = {}",
                enabled
            );
        }
    }

    #[tokio::test]
    async fn test_if_else_missing_branch_is_null() {
        let reducer = reducer();
        let definition = pipeline(json!([
            {
                "id": "@bricks/if-else",
                "config": {
                    "condition": false,
                    "if": {"__type__": "pipeline", "__value__": [echo_step(json!(1))]}
                }
            }
        ]));

        let outcome = reducer
            .reduce_pipeline(&definition, InitialValues::default(), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.into_value().unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_for_each_binds_the_element() {
        let reducer = reducer();
        let definition = pipeline(json!([
            {
                "id": "@bricks/for-each",
                "config": {
                    "elements": {"__type__": "var", "__value__": "@input.rows"},
                    "body": {"__type__": "pipeline", "__value__": [
                        echo_step(json!({"__type__": "var", "__value__": "@element.name"}))
                    ]}
                },
                "outputKey": "names"
            }
        ]));

        let outcome = reducer
            .reduce_pipeline(
                &definition,
                InitialValues::with_input(json!({"rows": [{"name": "a"}, {"name": "b"}]})),
                &RunOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.into_value().unwrap(),
            json!([{"value": "a"}, {"value": "b"}])
        );
    }

    #[tokio::test]
    async fn test_for_each_custom_element_key() {
        let reducer = reducer();
        let definition = pipeline(json!([
            {
                "id": "@bricks/for-each",
                "config": {
                    "elements": [1, 2, 3],
                    "elementKey": "row",
                    "body": {"__type__": "pipeline", "__value__": [
                        echo_step(json!({"__type__": "var", "__value__": "@row"}))
                    ]}
                }
            }
        ]));

        let outcome = reducer
            .reduce_pipeline(&definition, InitialValues::default(), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(
            outcome.into_value().unwrap(),
            json!([{"value": 1}, {"value": 2}, {"value": 3}])
        );
    }

    #[tokio::test]
    async fn test_iteration_bindings_do_not_leak() {
        let reducer = reducer();
        // After the loop, @element must not exist in the outer context
        let definition = pipeline(json!([
            {
                "id": "@bricks/for-each",
                "config": {
                    "elements": [1],
                    "body": {"__type__": "pipeline", "__value__": [echo_step(json!(null))]}
                }
            },
            echo_step(json!({"__type__": "var", "__value__": "@element?"}))
        ]));

        let outcome = reducer
            .reduce_pipeline(&definition, InitialValues::default(), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.into_value().unwrap(), json!({"value": null}));
    }

    #[tokio::test]
    async fn test_try_catch_recovers_with_error_binding() {
        let reducer = reducer();
        let definition = pipeline(json!([
            {
                "id": "@bricks/try-catch",
                "config": {
                    "try": {"__type__": "pipeline", "__value__": [
                        {"id": "test/does-not-exist", "config": {}}
                    ]},
                    "catch": {"__type__": "pipeline", "__value__": [
                        echo_step(json!({"__type__": "var", "__value__": "@error.message"}))
                    ]}
                }
            }
        ]));

        let outcome = reducer
            .reduce_pipeline(&definition, InitialValues::default(), &RunOptions::default())
            .await
            .unwrap();
        let value = outcome.into_value().unwrap();
        let message = value["value"].as_str().unwrap();
        assert!(message.contains("test/does-not-exist"));
    }

    #[tokio::test]
    async fn test_try_catch_does_not_catch_aborts() {
        let reducer = reducer();
        let definition = pipeline(json!([
            {
                "id": "@bricks/try-catch",
                "config": {
                    "try": {"__type__": "pipeline", "__value__": [echo_step(json!(1))]},
                    "catch": {"__type__": "pipeline", "__value__": []}
                }
            }
        ]));

        let options = RunOptions::default();
        options.cancel.cancel();
        let error = reducer
            .reduce_pipeline(&definition, InitialValues::default(), &options)
            .await
            .unwrap_err();
        assert!(matches!(error, BrickRuntimeError::Aborted));
    }

    #[tokio::test]
    async fn test_suspension_propagates_through_control_flow() {
        let reducer = reducer();
        let definition = pipeline(json!([
            {
                "id": "@bricks/if-else",
                "config": {
                    "condition": true,
                    "if": {"__type__": "pipeline", "__value__": [
                        {"id": "@bricks/document", "config": {"body": []}}
                    ]}
                }
            }
        ]));

        let options = RunOptions {
            headless: true,
            ..RunOptions::default()
        };
        let outcome = reducer
            .reduce_pipeline(&definition, InitialValues::default(), &options)
            .await
            .unwrap();
        assert!(outcome.is_suspended());
    }

    #[tokio::test]
    async fn test_renderer_rejected_in_no_renderer_flavor() {
        let reducer = reducer();
        let definition = pipeline(json!([
            {"id": "@bricks/document", "config": {"body": []}}
        ]));

        let options = RunOptions {
            flavor: PipelineFlavor::NoRenderer,
            ..RunOptions::default()
        };
        let error = reducer
            .reduce_pipeline(&definition, InitialValues::default(), &options)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            BrickRuntimeError::RendererNotAllowed { .. }
        ));
    }
}
