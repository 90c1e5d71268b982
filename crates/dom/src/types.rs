//! Core type definitions for the snapshot engine
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Keep attribute order exactly as the host reports it
//! 3. Use SmallVec for small arrays (avoid heap allocation)
//! 4. Use Option<Box<T>> for large optional fields (reduce struct size)

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Node identifier (index into arena)
/// u32 allows 4 billion nodes, enough for any webpage
pub type NodeId = u32;

/// Backend node identifier from CDP.
///
/// Stable for the lifetime of the page's document, never beyond it.
pub type BackendNodeId = u32;

/// Node type matching DOM specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CdataSection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NodeType::Element),
            2 => Some(NodeType::Attribute),
            3 => Some(NodeType::Text),
            4 => Some(NodeType::CdataSection),
            5 => Some(NodeType::EntityReference),
            6 => Some(NodeType::Entity),
            7 => Some(NodeType::ProcessingInstruction),
            8 => Some(NodeType::Comment),
            9 => Some(NodeType::Document),
            10 => Some(NodeType::DocumentType),
            11 => Some(NodeType::DocumentFragment),
            12 => Some(NodeType::Notation),
            _ => None,
        }
    }
}

/// Rectangle with coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DomRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Apply offset (viewport → page coordinates when given the scroll position)
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Current document scroll position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

impl ScrollOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The handful of computed style values a snapshot records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub display: String,
    pub color: String,
    pub background_color: String,
    pub font: String,
}

impl ComputedStyle {
    /// Only `display: none` hides an element. Opacity, `visibility` and
    /// zero-sized boxes are not consulted.
    pub fn is_displayed(&self) -> bool {
        self.display != "none"
    }
}

/// Render data captured from the live page for one element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Viewport coordinates (getBoundingClientRect)
    pub client_rect: DomRect,
    pub computed_style: ComputedStyle,
    /// Rendered text as the page reports it
    pub text: Option<String>,
    /// Serialized outer markup as the page reports it
    pub outer_html: Option<String>,
}

/// The main DOM tree node structure
///
/// Design philosophy:
/// - Small fixed-size fields first (better packing)
/// - Use indices instead of pointers
/// - Use Option<Box<T>> for large optional data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    // IDs
    pub node_id: NodeId,
    pub backend_node_id: BackendNodeId,
    pub node_type: NodeType,

    // Navigation indices
    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>, // Most nodes have <4 children

    pub node_name: String,
    pub local_name: String,
    pub node_value: String,
    pub attributes: Vec<(String, String)>,

    // Enhanced data (boxed to reduce struct size)
    pub snapshot_node: Option<Box<SnapshotNode>>,
}

impl DomNode {
    /// Create a new node with required fields
    pub fn new(
        node_id: NodeId,
        backend_node_id: BackendNodeId,
        node_type: NodeType,
        node_name: String,
    ) -> Self {
        Self {
            node_id,
            backend_node_id,
            node_type,
            node_name,
            local_name: String::new(),
            node_value: String::new(),
            attributes: Vec::new(),
            parent_id: None,
            children_ids: SmallVec::new(),
            snapshot_node: None,
        }
    }

    /// Get tag name for element nodes
    pub fn tag_name(&self) -> Option<&str> {
        if self.node_type == NodeType::Element {
            Some(&self.node_name)
        } else {
            None
        }
    }

    /// Name used when writing markup: the local name if the host gave one
    pub fn markup_name(&self) -> String {
        if self.local_name.is_empty() {
            self.node_name.to_lowercase()
        } else {
            self.local_name.clone()
        }
    }

    /// Check if node is an element
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, keeping its original position if it already exists
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_keeps_position() {
        let mut node = DomNode::new(0, 1, NodeType::Element, "A".to_string());
        node.set_attr("href", "/one");
        node.set_attr("class", "link");
        node.set_attr("href", "/two");

        assert_eq!(
            node.attributes,
            vec![
                ("href".to_string(), "/two".to_string()),
                ("class".to_string(), "link".to_string()),
            ]
        );
        assert_eq!(node.attr("href"), Some("/two"));
        assert_eq!(node.attr("id"), None);
    }

    #[test]
    fn test_only_display_none_hides() {
        let mut style = ComputedStyle {
            display: "block".to_string(),
            ..Default::default()
        };
        assert!(style.is_displayed());

        style.display = "none".to_string();
        assert!(!style.is_displayed());
    }

    #[test]
    fn test_rect_offset() {
        let rect = DomRect::new(10.0, 20.0, 30.0, 40.0).offset(5.0, 100.0);
        assert_eq!(rect, DomRect::new(15.0, 120.0, 30.0, 40.0));
    }
}
