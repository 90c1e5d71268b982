//! Arena-based DOM tree storage
//!
//! The arena is the in-process document host: a single `Vec<DomNode>`
//! addressed by `NodeId`, plus a lookup from CDP backend node ids.
//!
//! ## Memory Layout
//!
//! ```text
//! Arena: Vec<DomNode>
//!        [Node0][Node1][Node2]...
//!         ↑ 4-byte index, not 8-byte pointer
//! ```

use crate::error::{DomError, Result};
use crate::host::DocumentHost;
use crate::serializer;
use crate::types::{
    BackendNodeId, ComputedStyle, DomNode, DomRect, NodeId, NodeType, ScrollOffset,
};
use ahash::AHashMap;

/// Arena allocator for DOM nodes
///
/// Design:
/// - Single Vec<DomNode> for sequential allocation
/// - HashMap for backend_node_id → NodeId lookup (CDP uses backend IDs)
/// - No Rc/Arc: use indices everywhere
#[derive(Debug)]
pub struct DomArena {
    /// All nodes stored sequentially (cache-friendly)
    nodes: Vec<DomNode>,

    /// Backend node ID → NodeId lookup (for CDP integration)
    backend_id_map: AHashMap<BackendNodeId, NodeId>,

    /// Root node ID (if set)
    root_id: Option<NodeId>,

    /// Document scroll position at capture time
    scroll: ScrollOffset,
}

impl DomArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self::with_capacity(1024) // Pre-allocate for typical page
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            backend_id_map: AHashMap::with_capacity(capacity),
            root_id: None,
            scroll: ScrollOffset::default(),
        }
    }

    /// Create an arena holding only an empty document node
    pub fn with_document() -> Self {
        let mut arena = Self::new();
        let backend_id = arena.next_backend_id();
        let root = arena.add_node(DomNode::new(
            0,
            backend_id,
            NodeType::Document,
            "#document".to_string(),
        ));
        arena.root_id = Some(root);
        arena
    }

    /// Add a node to the arena, returns its ID
    ///
    /// The node's `node_id` is rewritten to its arena index.
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.node_id = node_id;
        self.backend_id_map.insert(node.backend_node_id, node_id);
        self.nodes.push(node);
        node_id
    }

    /// Add `node` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, mut node: DomNode) -> Result<NodeId> {
        self.get(parent)?;
        node.parent_id = Some(parent);
        let child = self.add_node(node);
        self.get_mut(parent)?.children_ids.push(child);
        Ok(child)
    }

    /// Append an element with the given tag name
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let mut node = DomNode::new(
            0,
            self.next_backend_id(),
            NodeType::Element,
            tag.to_ascii_uppercase(),
        );
        node.local_name = tag.to_string();
        self.append_child(parent, node)
    }

    /// Append a text node
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        let mut node = DomNode::new(0, self.next_backend_id(), NodeType::Text, "#text".into());
        node.node_value = text.to_string();
        self.append_child(parent, node)
    }

    /// Append a comment node
    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        let mut node = DomNode::new(
            0,
            self.next_backend_id(),
            NodeType::Comment,
            "#comment".into(),
        );
        node.node_value = text.to_string();
        self.append_child(parent, node)
    }

    fn next_backend_id(&self) -> BackendNodeId {
        self.nodes.len() as BackendNodeId + 1
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by backend node ID (from CDP)
    pub fn get_by_backend_id(&self, backend_id: BackendNodeId) -> Result<&DomNode> {
        let node_id = self
            .backend_id_map
            .get(&backend_id)
            .ok_or(DomError::NodeNotFound(backend_id))?;
        self.get(*node_id)
    }

    /// Get node ID by backend node ID
    pub fn get_node_id_by_backend(&self, backend_id: BackendNodeId) -> Option<NodeId> {
        self.backend_id_map.get(&backend_id).copied()
    }

    /// Set root node
    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        // Verify node exists
        self.get(node_id)?;
        self.root_id = Some(node_id);
        Ok(())
    }

    /// Get root node ID
    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    pub fn scroll(&self) -> ScrollOffset {
        self.scroll
    }

    pub fn set_scroll(&mut self, scroll: ScrollOffset) {
        self.scroll = scroll;
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Traverse tree depth-first (iterative, no recursion)
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut stack = vec![start_id];

        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            visit(node)?;

            // Push children in reverse order (so they're visited left-to-right)
            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
        }

        Ok(())
    }

    /// Pre-order rank of every node reachable from the root.
    ///
    /// Indexed by `NodeId`; unreachable nodes rank `usize::MAX`.
    pub fn document_order(&self) -> Result<Vec<usize>> {
        let mut ranks = vec![usize::MAX; self.nodes.len()];
        let root_id = self.root_id.ok_or(DomError::NoDocument)?;
        let mut next = 0;
        self.traverse_df(root_id, |node| {
            ranks[node.node_id as usize] = next;
            next += 1;
            Ok(())
        })?;
        Ok(ranks)
    }

    /// All elements under the root, in document order
    pub fn elements_in_order(&self) -> Result<Vec<NodeId>> {
        let root_id = self.root_id.ok_or(DomError::NoDocument)?;
        let mut elements = Vec::new();
        self.traverse_df(root_id, |node| {
            if node.is_element() {
                elements.push(node.node_id);
            }
            Ok(())
        })?;
        Ok(elements)
    }

    /// Clear arena (reuse allocation)
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.backend_id_map.clear();
        self.root_id = None;
        self.scroll = ScrollOffset::default();
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentHost for DomArena {
    type Node = NodeId;

    fn document(&self) -> Result<NodeId> {
        self.root_id.ok_or(DomError::NoDocument)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node)
            .map(|n| n.children_ids.to_vec())
            .unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).ok().and_then(|n| n.parent_id)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.get(node).ok().and_then(DomNode::tag_name)
    }

    fn client_rect(&self, node: NodeId) -> DomRect {
        self.get(node)
            .ok()
            .and_then(|n| n.snapshot_node.as_ref())
            .map(|s| s.client_rect)
            .unwrap_or_default()
    }

    fn scroll_offset(&self) -> ScrollOffset {
        self.scroll
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        self.get(node)
            .ok()
            .and_then(|n| n.snapshot_node.as_ref())
            .map(|s| s.computed_style.clone())
            .unwrap_or_default()
    }

    fn text(&self, node: NodeId) -> String {
        let captured = self
            .get(node)
            .ok()
            .and_then(|n| n.snapshot_node.as_ref())
            .and_then(|s| s.text.clone());
        match captured {
            Some(text) => text,
            None => serializer::text_content(self, node).unwrap_or_default(),
        }
    }

    fn outer_html(&self, node: NodeId) -> String {
        let captured = self
            .get(node)
            .ok()
            .and_then(|n| n.snapshot_node.as_ref())
            .and_then(|s| s.outer_html.clone());
        match captured {
            Some(html) => html,
            None => serializer::outer_html(self, node).unwrap_or_default(),
        }
    }

    fn attributes(&self, node: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.get(node)
            .ok()
            .into_iter()
            .flat_map(|n| n.attributes.iter())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
