// Brick Runtime Engine
// This contains the execution machinery that drives the domain models

//! # Engine Module
//!
//! The execution side of the runtime: everything that turns a parsed
//! [`BrickPipeline`](crate::BrickPipeline) into a result. The engine is
//! layered leaves-first:
//!
//! - **Validator** (`validator`): pure JSON-Schema validation of resolved
//!   args with structured violations
//! - **Resolver** (`resolver`): expression resolution against the
//!   execution context (vars, templates, lazy pipeline/defer)
//! - **Visitor** (`visitor`): the shared pipeline-tree traversal UI
//!   analysis and lint passes build on
//! - **Registry** (`registry`): explicit id -> brick table the reducer
//!   dispatches against
//! - **Reducer** (`reducer`): the core per-step loop and the headless
//!   suspension handoff
//! - **Trace** (`trace`): per-step execution records
//! - **Bricks** (`bricks`): the built-in control-flow and renderer set

/// Schema validation with structured violations
pub mod validator;

/// Expression resolution against the execution context
pub mod resolver;

/// Shared pipeline-tree traversal
pub mod visitor;

/// Brick trait, capability tags, and the injected registry
pub mod registry;

/// The core execution loop
pub mod reducer;

/// Per-step execution records
pub mod trace;

/// Built-in bricks (control flow, identity, document renderer)
pub mod bricks;

// Re-export main engine types for clean API access
pub use reducer::{
    BrickOptions, InitialValues, PipelineReducer, RendererPayload, RunOptions, RunOutcome,
};
pub use registry::{Brick, BrickKind, BrickRegistry};
pub use trace::{InMemoryTraceSink, StepOutcome, TraceRecord, TraceSink};
pub use validator::SchemaViolation;
pub use visitor::{walk_pipeline, PipelineFlavor, PipelineVisitor};
