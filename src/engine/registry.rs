// Brick registry - id -> implementation lookup for the reducer

//! # Brick Registry
//!
//! Maps a stable [`RegistryId`] to a brick implementation. The registry is
//! an **explicit instance** handed to the reducer at construction time -
//! never a global singleton - so tests and embedders can compose isolated
//! registries with exactly the bricks a scenario needs.
//!
//! The registry is the only resource shared across concurrent runs, and it
//! is read-only during execution: registration happens before/between
//! runs, lookups during. A `DashMap` keeps both sides lock-free enough
//! that interleaved runs never contend.
//!
//! ## Capabilities
//!
//! Every brick declares exactly one [`BrickKind`]. The reducer matches on
//! the kind - not on duck-typed method presence - so adding a capability
//! is a compile-time-checked change.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::reducer::{BrickOptions, RunOutcome};
use crate::models::{BrickPosition, BrickSchema, RegistryId};
use crate::{BrickRuntimeError, Result};

/// The closed set of brick capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrickKind {
    /// Produces a value; the value may be bound to the step's `outputKey`.
    Transform,
    /// Performs a side effect on the page; produces no bound output.
    Effect,
    /// Produces UI for a panel/sidebar surface. In headless runs the
    /// reducer suspends instead of invoking it.
    Renderer,
    /// Reads DOM/framework state from the step's root. Treated like a
    /// transform for output binding.
    Reader,
}

impl std::fmt::Display for BrickKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BrickKind::Transform => "transform",
            BrickKind::Effect => "effect",
            BrickKind::Renderer => "renderer",
            BrickKind::Reader => "reader",
        };
        write!(f, "{}", name)
    }
}

/// A registered unit of behavior invocable by id.
///
/// Implementations receive fully resolved, schema-validated args plus an
/// options bag exposing the narrowed context, the `run_pipeline` recursion
/// callback, and the run's cancellation token. Long-running bricks are
/// expected to observe cancellation cooperatively via
/// [`BrickOptions::ensure_active`].
#[async_trait]
pub trait Brick: Send + Sync + std::fmt::Debug {
    /// Stable registry id.
    fn id(&self) -> RegistryId;

    /// Capability of this brick.
    fn kind(&self) -> BrickKind;

    /// Schema the reducer validates resolved args against before invoking.
    fn input_schema(&self) -> BrickSchema;

    /// Optional schema for the brick's output.
    fn output_schema(&self) -> Option<BrickSchema> {
        None
    }

    /// Invoke the brick with resolved args.
    ///
    /// Leaf bricks return `RunOutcome::Completed`; control-flow bricks
    /// that recurse via [`BrickOptions::run_pipeline`] propagate whatever
    /// outcome the sub-pipeline produced (a nested renderer may suspend).
    async fn run(&self, args: Value, options: &BrickOptions<'_>) -> Result<RunOutcome>;
}

/// Explicit brick table injected into the reducer.
pub struct BrickRegistry {
    bricks: DashMap<RegistryId, Arc<dyn Brick>>,
}

impl BrickRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            bricks: DashMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in brick set
    /// (control flow, identity, document renderer).
    pub fn with_builtin_bricks() -> Self {
        let registry = Self::new();
        for brick in crate::engine::bricks::builtin_bricks() {
            registry.register(brick);
        }
        registry
    }

    /// Register a brick. A brick with the same id is replaced.
    pub fn register(&self, brick: Arc<dyn Brick>) {
        self.bricks.insert(brick.id(), brick);
    }

    /// Remove a brick by id, returning whether it was present.
    pub fn unregister(&self, id: &RegistryId) -> bool {
        self.bricks.remove(id).is_some()
    }

    /// Look up a brick by id.
    pub fn lookup(&self, id: &RegistryId) -> Option<Arc<dyn Brick>> {
        self.bricks.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a brick by id, failing with an Unknown Brick error naming
    /// the id and step position.
    pub fn lookup_required(
        &self,
        id: &RegistryId,
        position: &BrickPosition,
    ) -> Result<Arc<dyn Brick>> {
        self.lookup(id).ok_or_else(|| BrickRuntimeError::UnknownBrick {
            id: id.clone(),
            position: position.clone(),
        })
    }

    /// All registered ids.
    pub fn ids(&self) -> Vec<RegistryId> {
        self.bricks.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered bricks.
    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }
}

impl Default for BrickRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NullBrick;

    #[async_trait]
    impl Brick for NullBrick {
        fn id(&self) -> RegistryId {
            RegistryId::from("test/null")
        }

        fn kind(&self) -> BrickKind {
            BrickKind::Effect
        }

        fn input_schema(&self) -> BrickSchema {
            BrickSchema::empty()
        }

        async fn run(&self, _args: Value, _options: &BrickOptions<'_>) -> Result<RunOutcome> {
            Ok(RunOutcome::Completed(Value::Null))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = BrickRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(NullBrick));
        assert_eq!(registry.len(), 1);

        let id = RegistryId::from("test/null");
        assert!(registry.lookup(&id).is_some());
        assert!(registry
            .lookup_required(&id, &BrickPosition::root())
            .is_ok());

        assert!(registry.unregister(&id));
        assert!(registry.lookup(&id).is_none());
    }

    #[test]
    fn test_lookup_required_names_id_and_position() {
        let registry = BrickRegistry::new();
        let id = RegistryId::from("test/does-not-exist");
        let position = BrickPosition::root().push_index(2);

        let err = registry.lookup_required(&id, &position).unwrap_err();
        match err {
            BrickRuntimeError::UnknownBrick {
                id: missing,
                position: at,
            } => {
                assert_eq!(missing, id);
                assert_eq!(at, position);
            }
            other => panic!("expected UnknownBrick, got {:?}", other),
        }
    }

    #[test]
    fn test_builtins_present() {
        let registry = BrickRegistry::with_builtin_bricks();
        assert!(registry.lookup(&RegistryId::from("@bricks/if-else")).is_some());
        assert!(registry.lookup(&RegistryId::from("@bricks/for-each")).is_some());
        assert!(registry.lookup(&RegistryId::from("@bricks/document")).is_some());
    }
}
