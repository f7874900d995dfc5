// Brick positions - tree addressing for error attribution

//! # Brick Position
//!
//! A `BrickPosition` is a dotted string path identifying where a step (or a
//! config field of a step) lives inside the overall pipeline tree, e.g.
//! `pipeline.0.config.body.__value__.1`.
//!
//! Positions are **derived, never stored**: traversal and execution build
//! them on the way down so that every error and trace record can point back
//! at the exact step a mod author has to look at. The UI layer uses the same
//! addressing scheme to cross-reference runtime errors with editor nodes.

use serde::{Deserialize, Serialize};

/// Path into the pipeline tree, used for error attribution and
/// UI cross-referencing.
///
/// ## Examples:
///
/// - `pipeline.0` - first step of the root pipeline
/// - `pipeline.2.if` - condition field of the third step
/// - `pipeline.1.config.body.__value__.0` - first step of a sub-pipeline
///   stored in the `body` config field of the second step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrickPosition(String);

impl BrickPosition {
    /// The root pipeline of a mod component.
    pub fn root() -> Self {
        BrickPosition("pipeline".to_string())
    }

    /// Start a position at an arbitrary base segment.
    ///
    /// Useful for callers that address multiple pipelines of the same mod
    /// component (e.g. a tour step's own pipeline vs. its root pipeline).
    pub fn new<S: Into<String>>(base: S) -> Self {
        BrickPosition(base.into())
    }

    /// Extend the path with a numeric index (a step in a pipeline, an
    /// element of an array literal).
    pub fn push_index(&self, index: usize) -> Self {
        BrickPosition(format!("{}.{}", self.0, index))
    }

    /// Extend the path with a named field (a config key, `if`,
    /// `__value__`, a document element's `children`).
    pub fn push_field(&self, field: &str) -> Self {
        BrickPosition(format!("{}.{}", self.0, field))
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BrickPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_building() {
        let position = BrickPosition::root()
            .push_index(0)
            .push_field("config")
            .push_field("body")
            .push_field("__value__")
            .push_index(1);
        assert_eq!(position.as_str(), "pipeline.0.config.body.__value__.1");
    }

    #[test]
    fn test_position_round_trip() {
        let position = BrickPosition::root().push_index(3).push_field("if");
        let json = serde_json::to_string(&position).unwrap();
        assert_eq!(json, "\"pipeline.3.if\"");
        let back: BrickPosition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, position);
    }
}
