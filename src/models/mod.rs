// Core domain models for the brick pipeline runtime
// These are the serializable data structures stored mod definitions parse into

//! # Domain Models Module
//!
//! This module contains the core domain models for the brick runtime. They
//! are pure data: everything here serializes with serde, and nothing here
//! executes a pipeline. Execution machinery lives in [`crate::engine`].
//!
//! The on-disk shapes (`BrickConfig`, `Expression`) are stable interfaces:
//! stored mod definitions must keep executing across platform rewrites, so
//! field names and the `__type__`/`__value__` expression tagging round-trip
//! exactly.

// Declares the `expression` submodule from `expression.rs`
// Contains Expression and the literal-vs-expression classification predicates
pub mod expression;

// Declares the `brick` submodule from `brick.rs`
// Contains BrickConfig and BrickPipeline - the stored shape of mod logic
pub mod brick;

// Declares the `context` submodule from `context.rs`
// Contains ExecutionContext - per-run variable state
pub mod context;

// Declares the `root` submodule from `root.rs`
// Contains ElementRef and RootMode - DOM scope targeting
pub mod root;

// Declares the `position` submodule from `position.rs`
// Contains BrickPosition - tree addressing for error attribution
pub mod position;

// Declares the `schema` submodule from `schema.rs`
// Contains BrickSchema - JSON Schema wrapper for brick inputs/outputs
pub mod schema;

// Re-export main types for convenience
// This creates shortcuts so users don't need to know the internal structure

/// Re-export the expression model
/// Expression is the tagged union of deferred config values; the
/// predicates classify raw JSON values without failing
pub use expression::{
    is_defer_expression, is_expression, is_pipeline_expression, is_template_expression,
    is_var_expression, Expression,
};

/// Re-export brick configuration types
/// BrickConfig is one step; BrickPipeline is the ordered sequence
pub use brick::{BrickConfig, BrickPipeline, RegistryId, WindowTarget};

/// Re-export the execution context
pub use context::ExecutionContext;

/// Re-export root targeting types
pub use root::{ElementRef, RootMode};

/// Re-export position addressing
pub use position::BrickPosition;

/// Re-export the schema wrapper
pub use schema::BrickSchema;
