// Pipeline reducer - the core execution loop

//! # Pipeline Reducer
//!
//! Sequentially executes a brick pipeline against a live page context. Per
//! step, in strict array order: resolve the `if` gate, resolve the config
//! via the expression resolver, validate the resolved args against the
//! brick's input schema, look the brick up in the registry, derive the
//! effective root, and dispatch on the brick's capability. Step N+1 never
//! begins resolution until step N's invocation has fully settled.
//!
//! The reducer has **no special-cased knowledge of control flow**: loop
//! and branch bricks are ordinary steps whose implementations call back
//! into the reducer through [`BrickOptions::run_pipeline`], each time with
//! a freshly narrowed context. The reducer supplies the recursion
//! primitive; iteration policy lives in the bricks.
//!
//! ## Failure semantics
//!
//! First error wins: any step's error terminates the entire run and
//! propagates to the caller. There is no catch-and-continue in the core
//! loop - recovery belongs to control-flow bricks that wrap their own
//! `run_pipeline` calls (see `@bricks/try-catch`).
//!
//! ## The headless handoff
//!
//! A renderer step in a headless run does not produce a value: the run
//! completes with [`RunOutcome::Suspended`], carrying the renderer's brick
//! id, resolved args, and the variable table at suspension. The
//! starter-brick adapter redirects that payload to a panel/sidebar
//! surface. Suspension is a first-class result variant, never an error,
//! so nothing upstream can mistake the handoff for a failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::registry::{BrickKind, BrickRegistry};
use crate::engine::resolver;
use crate::engine::trace::{StepOutcome, TraceRecord, TraceSink};
use crate::engine::validator;
use crate::engine::visitor::PipelineFlavor;
use crate::models::{
    BrickConfig, BrickPipeline, BrickPosition, ElementRef, ExecutionContext, Expression,
    RegistryId, RootMode,
};
use crate::{BrickRuntimeError, Result};

/// The values a starter brick supplies when invoking a run.
#[derive(Debug, Clone, Default)]
pub struct InitialValues {
    /// Reader/event data (`@input`).
    pub input: Value,
    /// The DOM scope the run starts from (the trigger's event target, the
    /// panel's mount point, or the document).
    pub root: ElementRef,
    /// Resolved service/integration bindings, keyed without the `@` sigil.
    pub integration_context: Map<String, Value>,
    /// Mod-level configuration (`@options`).
    pub options_args: Map<String, Value>,
}

impl InitialValues {
    /// Initial values with only reader input; root defaults to the
    /// document.
    pub fn with_input(input: Value) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    fn into_context(self) -> ExecutionContext {
        ExecutionContext::new(
            self.input,
            self.integration_context,
            self.options_args,
            self.root,
        )
    }
}

/// Per-run options supplied by the starter-brick adapter.
#[derive(Clone)]
pub struct RunOptions {
    /// Correlation id for logging and trace records.
    pub run_id: Uuid,
    /// Headless mode: a renderer step suspends the run instead of
    /// rendering in place.
    pub headless: bool,
    /// Renderer policy for the root pipeline.
    pub flavor: PipelineFlavor,
    /// Cooperative cancellation. The reducer checks between steps; bricks
    /// observe it via [`BrickOptions::ensure_active`]. Cancellation is
    /// advisory, never preemptive.
    pub cancel: CancellationToken,
    /// Optional per-step trace destination.
    pub trace: Option<Arc<dyn TraceSink>>,
    /// Check brick outputs against their declared output schema and log a
    /// warning on mismatch.
    pub validate_output: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            headless: false,
            flavor: PipelineFlavor::Renderer,
            cancel: CancellationToken::new(),
            trace: None,
            validate_output: false,
        }
    }
}

/// The payload a headless run hands back to the caller in place of a
/// value. Consumed by the starter-brick adapter, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererPayload {
    /// The renderer brick to invoke in the target surface.
    pub brick_id: RegistryId,
    /// The renderer step's resolved config.
    pub args: Value,
    /// The variable table at suspension.
    pub ctxt: Value,
}

/// How a run concluded: a terminal value, or a renderer handoff.
#[derive(Debug)]
pub enum RunOutcome {
    /// The last step's value (null for empty pipelines and trailing
    /// effects).
    Completed(Value),
    /// A headless renderer handoff.
    Suspended(RendererPayload),
}

impl RunOutcome {
    /// Whether this run suspended at a renderer.
    pub fn is_suspended(&self) -> bool {
        matches!(self, RunOutcome::Suspended(_))
    }

    /// The completed value, failing if the run suspended. For callers
    /// running in contexts whose flavor already excludes renderers.
    pub fn into_value(self) -> Result<Value> {
        match self {
            RunOutcome::Completed(value) => Ok(value),
            RunOutcome::Suspended(payload) => Err(BrickRuntimeError::Internal(format!(
                "Pipeline suspended at renderer {} where a value was required",
                payload.brick_id
            ))),
        }
    }
}

/// Options bag handed to every brick invocation.
///
/// Exposes the narrowed context (including the step's effective root),
/// the recursion callback for control-flow bricks, and the run's
/// cancellation token.
pub struct BrickOptions<'a> {
    /// The step's context: earlier output-key bindings visible, root set
    /// to the step's effective root.
    pub ctxt: ExecutionContext,
    /// The step's position, for error attribution in sub-pipelines.
    pub position: BrickPosition,
    /// Id of the brick being invoked.
    pub brick_id: RegistryId,
    /// Renderer policy of the surrounding pipeline.
    pub flavor: PipelineFlavor,
    /// Correlation id of the run.
    pub run_id: Uuid,
    /// Cooperative cancellation token.
    pub cancel: CancellationToken,
    reducer: &'a PipelineReducer,
    run_options: &'a RunOptions,
}

impl BrickOptions<'_> {
    /// Fail with [`BrickRuntimeError::Aborted`] if the run was cancelled.
    ///
    /// Long-running bricks call this before/between expensive operations.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(BrickRuntimeError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Run a still-wrapped `pipeline` expression from this brick's config
    /// with a caller-narrowed context.
    ///
    /// `field` is the config field the expression came from; it determines
    /// the sub-pipeline's position (`<step>.config.<field>.__value__`) and
    /// its renderer flavor. The outcome is whatever the sub-pipeline
    /// produced - including a suspension, which the calling brick is
    /// expected to propagate.
    pub fn run_pipeline<'b>(
        &'b self,
        field: &str,
        wrapped: &Value,
        ctxt: ExecutionContext,
    ) -> BoxFuture<'b, Result<RunOutcome>> {
        let position = self
            .position
            .push_field("config")
            .push_field(field)
            .push_field("__value__");
        let flavor = PipelineFlavor::for_sub_pipeline(&self.brick_id, field, self.flavor);

        let parsed: Result<BrickPipeline> = match Expression::from_value(wrapped) {
            Ok(Expression::Pipeline(pipeline)) => Ok(pipeline),
            Ok(other) => Err(BrickRuntimeError::InvalidPipeline {
                position: position.clone(),
                reason: format!("expected a pipeline expression, found {}", other.type_tag()),
            }),
            Err(reason) => Err(BrickRuntimeError::InvalidPipeline {
                position: position.clone(),
                reason,
            }),
        };

        let reducer = self.reducer;
        let run_options = self.run_options;
        async move {
            let pipeline = parsed?;
            reducer
                .reduce_inner(&pipeline, ctxt, position, flavor, run_options)
                .await
        }
        .boxed()
    }

    /// Resolve a deferred config value now, against a caller-supplied
    /// context (typically narrowed per loop element).
    pub fn resolve_deferred(&self, value: &Value, ctxt: &ExecutionContext) -> Result<Value> {
        resolver::resolve_deferred(value, ctxt, &self.position)
    }
}

/// The runtime core: executes pipelines against an injected registry.
///
/// A reducer holds no per-run state; each [`reduce_pipeline`] invocation
/// owns a private [`ExecutionContext`], so concurrently triggered runs
/// interleave freely on the event loop without observing each other.
///
/// [`reduce_pipeline`]: PipelineReducer::reduce_pipeline
pub struct PipelineReducer {
    registry: Arc<BrickRegistry>,
}

enum StepRun {
    Skipped,
    Completed(Value),
    Suspended(RendererPayload),
}

impl PipelineReducer {
    /// Create a reducer over a registry.
    pub fn new(registry: Arc<BrickRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this reducer dispatches against.
    pub fn registry(&self) -> &Arc<BrickRegistry> {
        &self.registry
    }

    /// Execute a pipeline to completion or suspension.
    ///
    /// This is the starter-brick adapter contract: the caller supplies the
    /// pipeline, the initial values, and the run options, and receives
    /// either `Completed(value)`, `Suspended(payload)` (headless renderer
    /// handoff), or an error from [`crate::BrickRuntimeError`].
    pub async fn reduce_pipeline(
        &self,
        pipeline: &BrickPipeline,
        initial: InitialValues,
        options: &RunOptions,
    ) -> Result<RunOutcome> {
        debug!(run_id = %options.run_id, steps = pipeline.len(), "Starting pipeline run");
        let outcome = self
            .reduce_inner(
                pipeline,
                initial.into_context(),
                BrickPosition::root(),
                options.flavor,
                options,
            )
            .await;
        match &outcome {
            Ok(RunOutcome::Completed(_)) => {
                debug!(run_id = %options.run_id, "Pipeline run completed")
            }
            Ok(RunOutcome::Suspended(payload)) => {
                debug!(run_id = %options.run_id, brick = %payload.brick_id, "Pipeline run suspended for rendering")
            }
            Err(error) if error.is_expected() => {
                debug!(run_id = %options.run_id, %error, "Pipeline run ended early")
            }
            Err(error) => warn!(run_id = %options.run_id, %error, "Pipeline run failed"),
        }
        outcome
    }

    async fn reduce_inner(
        &self,
        pipeline: &BrickPipeline,
        mut ctxt: ExecutionContext,
        position: BrickPosition,
        flavor: PipelineFlavor,
        options: &RunOptions,
    ) -> Result<RunOutcome> {
        let mut last_value = Value::Null;

        for (index, step) in pipeline.iter().enumerate() {
            let step_position = position.push_index(index);
            let started_at = Utc::now();
            let mut traced_args = None;

            let result = self
                .run_step(step, &mut ctxt, &step_position, flavor, options, &mut traced_args)
                .await;

            match result {
                Ok(StepRun::Skipped) => {
                    debug!(brick = %step.id, position = %step_position, "Step skipped by condition");
                    self.emit_trace(options, step, &step_position, None, StepOutcome::Skipped, started_at)
                        .await;
                }
                Ok(StepRun::Completed(value)) => {
                    self.emit_trace(
                        options,
                        step,
                        &step_position,
                        traced_args,
                        StepOutcome::Completed {
                            output: value.clone(),
                        },
                        started_at,
                    )
                    .await;
                    last_value = value;
                }
                Ok(StepRun::Suspended(payload)) => {
                    self.emit_trace(
                        options,
                        step,
                        &step_position,
                        traced_args,
                        StepOutcome::Suspended,
                        started_at,
                    )
                    .await;
                    return Ok(RunOutcome::Suspended(payload));
                }
                Err(error) => {
                    self.emit_trace(
                        options,
                        step,
                        &step_position,
                        traced_args,
                        StepOutcome::Failed {
                            error: error.to_string(),
                            expected: error.is_expected(),
                        },
                        started_at,
                    )
                    .await;
                    return Err(error);
                }
            }
        }

        Ok(RunOutcome::Completed(last_value))
    }

    async fn run_step(
        &self,
        step: &BrickConfig,
        ctxt: &mut ExecutionContext,
        position: &BrickPosition,
        flavor: PipelineFlavor,
        options: &RunOptions,
        traced_args: &mut Option<Value>,
    ) -> Result<StepRun> {
        if options.cancel.is_cancelled() {
            return Err(BrickRuntimeError::Aborted);
        }

        // 1. Condition gate: a falsy `if` skips the step entirely
        if let Some(condition) = &step.condition {
            let resolved =
                resolver::resolve_value(condition, ctxt, &position.push_field("if"))?;
            if !resolver::is_truthy(&resolved) {
                return Ok(StepRun::Skipped);
            }
        }

        // 2. Resolve the config into concrete args
        let args = resolver::resolve_config(&step.config, ctxt, position)?;
        *traced_args = Some(args.clone());

        // 3. Registry lookup
        let brick = self.registry.lookup_required(&step.id, position)?;

        // 4. Input schema gate
        let input_schema = brick.input_schema();
        let violations = validator::validate(&input_schema.schema, &args);
        if !violations.is_empty() {
            return Err(BrickRuntimeError::InputValidation {
                brick_id: step.id.clone(),
                position: position.clone(),
                violations,
                args,
                schema: input_schema.schema,
            });
        }

        // 5. Effective root for the step
        let root = Self::effective_root(step, ctxt, position)?;

        if brick.kind() == BrickKind::Renderer {
            if !flavor.allows_renderer() {
                return Err(BrickRuntimeError::RendererNotAllowed {
                    id: step.id.clone(),
                    position: position.clone(),
                });
            }
            if options.headless {
                // The headless handoff: hand the resolved payload back to
                // the caller instead of invoking the renderer here
                return Ok(StepRun::Suspended(RendererPayload {
                    brick_id: step.id.clone(),
                    args,
                    ctxt: Value::Object(ctxt.variable_table()),
                }));
            }
        }

        // 6. Invoke
        let brick_options = BrickOptions {
            ctxt: ctxt.with_root(root),
            position: position.clone(),
            brick_id: step.id.clone(),
            flavor,
            run_id: options.run_id,
            cancel: options.cancel.clone(),
            reducer: self,
            run_options: options,
        };
        debug!(brick = %step.id, kind = %brick.kind(), position = %position, "Invoking brick");
        let value = match brick.run(args, &brick_options).await? {
            RunOutcome::Completed(value) => value,
            // A nested renderer suspended inside a control-flow brick
            RunOutcome::Suspended(payload) => return Ok(StepRun::Suspended(payload)),
        };

        if options.validate_output {
            if let Some(output_schema) = brick.output_schema() {
                let violations = validator::validate(&output_schema.schema, &value);
                if !violations.is_empty() {
                    warn!(
                        brick = %step.id,
                        position = %position,
                        count = violations.len(),
                        "Brick output does not match its declared output schema"
                    );
                }
            }
        }

        // 7. Output binding by capability
        match brick.kind() {
            BrickKind::Transform | BrickKind::Reader | BrickKind::Renderer => {
                if let Some(key) = &step.output_key {
                    ctxt.bind_output(key.clone(), value.clone());
                }
                Ok(StepRun::Completed(value))
            }
            BrickKind::Effect => {
                if step.output_key.is_some() {
                    warn!(brick = %step.id, position = %position, "outputKey on an effect brick is ignored");
                }
                Ok(StepRun::Completed(Value::Null))
            }
        }
    }

    fn effective_root(
        step: &BrickConfig,
        ctxt: &ExecutionContext,
        position: &BrickPosition,
    ) -> Result<ElementRef> {
        match step.root_mode {
            RootMode::Inherit => Ok(ctxt.root.clone()),
            RootMode::Document => Ok(ElementRef::Document),
            RootMode::Element => {
                let selector =
                    step.root
                        .as_deref()
                        .ok_or_else(|| BrickRuntimeError::InvalidPipeline {
                            position: position.clone(),
                            reason: "rootMode \"element\" requires a root selector".to_string(),
                        })?;
                Ok(ctxt.root.narrowed(selector))
            }
        }
    }

    async fn emit_trace(
        &self,
        options: &RunOptions,
        step: &BrickConfig,
        position: &BrickPosition,
        args: Option<Value>,
        outcome: StepOutcome,
        started_at: DateTime<Utc>,
    ) {
        if let Some(sink) = &options.trace {
            sink.record(TraceRecord {
                run_id: options.run_id,
                position: position.clone(),
                brick_id: step.id.clone(),
                instance_id: step.instance_id.clone(),
                args,
                outcome,
                started_at,
                finished_at: Utc::now(),
            })
            .await;
        }
    }
}
