// Root targeting - DOM scope handles for reader/selector steps

//! # Root Targeting
//!
//! Every step of a pipeline runs against a **root**: the DOM element or
//! document that scopes its reader/selector operations. The runtime never
//! touches a real DOM - the starter-brick layer that invokes a run supplies
//! an [`ElementRef`] handle, and bricks interpret it against whatever page
//! binding they own. The handle is serializable so that trace records and
//! renderer payloads can carry it across the extension messaging boundary.
//!
//! A step declares *how* its effective root is derived via [`RootMode`]:
//! inherit the current root, reset to the document, or narrow to an element
//! selected relative to the current root.

use serde::{Deserialize, Serialize};

/// Opaque handle to the DOM scope a step runs against.
///
/// The runtime only ever constructs, narrows, and forwards these handles;
/// resolving a handle to live elements is the invoking brick's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ElementRef {
    /// The whole document.
    Document,
    /// An element scoped by a CSS selector, relative to the document.
    Element { selector: String },
}

impl ElementRef {
    /// Create an element handle from a selector.
    pub fn element<S: Into<String>>(selector: S) -> Self {
        ElementRef::Element {
            selector: selector.into(),
        }
    }

    /// The selector for element-scoped handles, `None` for the document.
    pub fn selector(&self) -> Option<&str> {
        match self {
            ElementRef::Document => None,
            ElementRef::Element { selector } => Some(selector),
        }
    }

    /// Whether this handle refers to the whole document.
    pub fn is_document(&self) -> bool {
        matches!(self, ElementRef::Document)
    }

    /// Narrow this handle by a descendant selector.
    ///
    /// Narrowing the document yields an element handle; narrowing an
    /// element composes the selectors with descendant combination.
    pub fn narrowed(&self, selector: &str) -> Self {
        match self {
            ElementRef::Document => ElementRef::element(selector),
            ElementRef::Element { selector: base } => {
                ElementRef::element(format!("{} {}", base, selector))
            }
        }
    }
}

impl Default for ElementRef {
    fn default() -> Self {
        ElementRef::Document
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementRef::Document => write!(f, "document"),
            ElementRef::Element { selector } => write!(f, "{}", selector),
        }
    }
}

/// How a step derives its effective root from the run's current root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootMode {
    /// Use the current root unchanged (the default).
    Inherit,
    /// Ignore the current root and target the whole document.
    Document,
    /// Narrow the current root by the step's `root` selector.
    Element,
}

impl RootMode {
    /// Whether this is the default inherit mode (used to omit the field
    /// when serializing step configs).
    pub fn is_inherit(&self) -> bool {
        matches!(self, RootMode::Inherit)
    }
}

impl Default for RootMode {
    fn default() -> Self {
        RootMode::Inherit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowing() {
        let root = ElementRef::Document;
        let panel = root.narrowed("#panel");
        assert_eq!(panel.selector(), Some("#panel"));

        let row = panel.narrowed(".row");
        assert_eq!(row.selector(), Some("#panel .row"));
    }

    #[test]
    fn test_serialized_shape() {
        let element = ElementRef::element("#app");
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "element", "selector": "#app"})
        );

        let document: ElementRef =
            serde_json::from_value(serde_json::json!({"kind": "document"})).unwrap();
        assert!(document.is_document());
    }

    #[test]
    fn test_root_mode_default() {
        assert_eq!(RootMode::default(), RootMode::Inherit);
        let mode: RootMode = serde_json::from_str("\"element\"").unwrap();
        assert_eq!(mode, RootMode::Element);
    }
}
