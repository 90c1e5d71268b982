//! Host seam
//!
//! The walker and resolver never own the document. They talk to whatever
//! renders it through these two traits. `DomArena` implements both; a live
//! browser binding can too.
//!
//! Node handles are borrowed views: `Copy` identifiers that are only
//! meaningful while the host's document stays unchanged.

use crate::error::Result;
use crate::types::{ComputedStyle, DomRect, ScrollOffset};
use std::fmt::Debug;

/// Read-only view of a rendered document tree.
pub trait DocumentHost {
    /// Opaque, non-owning node handle
    type Node: Copy + Eq + Debug;

    /// The document node (the root every path starts from)
    fn document(&self) -> Result<Self::Node>;

    /// Direct children in document order, tagged or not
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Tag name for elements, `None` for text, comments, doctypes, ...
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    /// Bounding rectangle in viewport coordinates
    fn client_rect(&self, node: Self::Node) -> DomRect;

    fn scroll_offset(&self) -> ScrollOffset;

    fn computed_style(&self, node: Self::Node) -> ComputedStyle;

    /// Rendered text content
    fn text(&self, node: Self::Node) -> String;

    /// Serialized markup of the node and its descendants
    fn outer_html(&self, node: Self::Node) -> String;

    /// Attribute list in host order
    fn attributes(&self, node: Self::Node) -> impl Iterator<Item = (&str, &str)>;
}

/// Hosts that can evaluate path expressions.
///
/// Each call to `evaluate` starts a fresh evaluation. The returned iterator
/// is forward-only: `next()` yields matches in document order and `None`
/// is the host's exhaustion signal.
pub trait PathEvaluator: DocumentHost {
    type Matches<'a>: Iterator<Item = Self::Node>
    where
        Self: 'a;

    fn evaluate(&self, expression: &str) -> Result<Self::Matches<'_>>;
}
