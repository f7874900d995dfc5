// Brick Runtime - Rust Edition
// The execution engine for declarative brick pipelines running against a live page context

//! # Brick Runtime Library
//!
//! This is the main library crate for the brick pipeline runtime: the
//! component that takes a declarative, serializable pipeline definition (a
//! tree of brick invocations, conditionals, sub-pipelines, and
//! variable/template expressions) and executes it against a live page
//! context, producing either a data result or a deferred "headless"
//! renderer handoff.
//!
//! ## Core Components
//!
//! ### Domain Models
//! - [`BrickPipeline`] / [`BrickConfig`]: the stored shape of mod logic
//! - [`Expression`]: deferred config values (`var`, `nunjucks`,
//!   `pipeline`, `defer`) with a stable two-key serialized form
//! - [`ExecutionContext`]: per-run variable state
//! - [`ElementRef`]: opaque DOM scope handle supplied by the caller
//!
//! ### Engine
//! - [`PipelineReducer`]: the core run loop - per step it resolves
//!   arguments, validates them against the brick's input schema, and
//!   dispatches on the brick's capability
//! - [`BrickRegistry`]: explicit, injected brick table (no global
//!   singleton) - tests and embedders compose isolated registries
//! - [`RunOutcome`]: the discriminated run result - `Completed(value)` or
//!   `Suspended(payload)` when a headless run hands a renderer payload
//!   back to the caller instead of producing a value
//!
//! ## Usage Example:
//! ```rust
//! use std::sync::Arc;
//! use brick_runtime::{
//!     BrickPipeline, BrickRegistry, InitialValues, PipelineReducer, RunOptions,
//! };
//!
//! # async fn run() -> brick_runtime::Result<()> {
//! let registry = Arc::new(BrickRegistry::with_builtin_bricks());
//! let reducer = PipelineReducer::new(registry);
//!
//! let pipeline = BrickPipeline::from_yaml(
//!     r#"
//! - id: "@bricks/identity"
//!   config:
//!     value: { __type__: var, __value__: "@input.message" }
//!   outputKey: echoed
//! "#,
//! )?;
//!
//! let initial = InitialValues::with_input(serde_json::json!({"message": "hi"}));
//! let outcome = reducer
//!     .reduce_pipeline(&pipeline, initial, &RunOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

// Core domain models (serializable, no execution semantics)
pub mod models;

// Engine implementations (reducer, resolver, validator, visitor, registry)
pub mod engine;

// Re-export core domain types for easy access
// This creates a "flat" API - users can import directly from the crate root
pub use models::{
    BrickConfig,      // One pipeline step
    BrickPipeline,    // Ordered sequence of steps
    BrickPosition,    // Tree addressing for error attribution
    BrickSchema,      // JSON Schema wrapper for brick inputs/outputs
    ElementRef,       // Opaque DOM scope handle
    ExecutionContext, // Per-run variable state
    Expression,       // Deferred config values
    RegistryId,       // Stable brick identifier
    RootMode,         // Per-step root derivation
};

// Re-export engine types for convenience
pub use engine::{
    bricks::builtin_bricks,
    reducer::{
        BrickOptions, InitialValues, PipelineReducer, RendererPayload, RunOptions, RunOutcome,
    },
    registry::{Brick, BrickKind, BrickRegistry},
    trace::{InMemoryTraceSink, StepOutcome, TraceRecord, TraceSink},
    validator::SchemaViolation,
    visitor::{walk_pipeline, PipelineFlavor, PipelineVisitor},
};

// Core error types
use thiserror::Error;

use engine::validator::SchemaViolation as Violation;
use models::{BrickPosition as Position, RegistryId as Id};

/// Error taxonomy for pipeline runs.
///
/// The reducer does not catch and recover from any step failure itself:
/// first error wins and propagates to the caller. Recovery (retry,
/// fallback, skip) belongs exclusively to control-flow bricks that wrap
/// their own `run_pipeline` calls.
///
/// Renderer suspension is deliberately **not** part of this enum - it is a
/// first-class [`RunOutcome::Suspended`](engine::reducer::RunOutcome)
/// result, so outer handlers cannot misclassify the handoff as a failure.
#[derive(Error, Debug)]
pub enum BrickRuntimeError {
    /// Resolved args failed schema validation. Carries enough structure
    /// for a detail view to reconstruct "what was sent vs. what was
    /// expected" without re-running the pipeline.
    #[error("Invalid inputs for brick {brick_id} at {position}")]
    InputValidation {
        brick_id: Id,
        position: Position,
        violations: Vec<Violation>,
        /// The rendered arguments that failed validation.
        args: serde_json::Value,
        /// The schema they were validated against.
        schema: serde_json::Value,
    },

    /// A step references an id absent from the registry. Fatal to the run.
    #[error("Unknown brick: {id} at {position}")]
    UnknownBrick { id: Id, position: Position },

    /// A `var` expression's path cannot be traversed (missing intermediate
    /// key on a non-coalescing segment).
    #[error("Cannot read segment '{segment}' of path '{path}'")]
    PathResolution { path: String, segment: String },

    /// A value classified as an expression but its payload shape is
    /// invalid for its tag.
    #[error("Malformed expression at {position}: {reason}")]
    MalformedExpression { position: Position, reason: String },

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(String),

    /// A structurally invalid step (e.g. `rootMode: element` without a
    /// `root` selector, a control-flow field that is not a pipeline).
    #[error("Invalid pipeline definition at {position}: {reason}")]
    InvalidPipeline { position: Position, reason: String },

    /// A renderer brick placed in a sub-pipeline context where rendering
    /// is not permitted (e.g. a document button handler).
    #[error("Renderer brick {id} is not allowed at {position}")]
    RendererNotAllowed { id: Id, position: Position },

    /// Expected, user-actionable failure raised by a specific brick
    /// ("no elements found", "multiple elements found"). Surfaced for
    /// display, not a platform bug.
    #[error("{0}")]
    Business(String),

    /// The run's abort signal fired. Expected by telemetry, not a bug.
    #[error("Run aborted")]
    Aborted,

    /// JSON serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML mod-definition parse errors.
    #[error("Definition parse error: {0}")]
    Definition(#[from] serde_yaml::Error),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrickRuntimeError {
    /// Whether telemetry should treat this error as expected rather than
    /// reporting it as a platform bug.
    ///
    /// Aborts and business errors are part of normal operation; everything
    /// else indicates a broken mod definition or a runtime defect.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            BrickRuntimeError::Aborted | BrickRuntimeError::Business(_)
        )
    }
}

/// Type alias for Results that use our custom error type.
pub type Result<T> = std::result::Result<T, BrickRuntimeError>;
