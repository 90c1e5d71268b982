//! DOM Service - builds a snapshot-ready arena from CDP data
//!
//! This handles:
//! - CDP integration (parsing `DOM.getDocument` responses)
//! - Merging per-element render facts (style, geometry, text, markup)
//! - Snapshot / resolve / path lookups keyed by backend node ids

use crate::arena::DomArena;
use crate::attributes::{extract_attributes, Attributes};
use crate::error::{DomError, Result};
use crate::record::Record;
use crate::resolver::resolve;
use crate::types::*;
use crate::walker::{path_of, walk_document};
use serde::Deserialize;
use serde_json::Value;

/// Render facts for one element, in the order the page script emits them:
/// `[display, color, background, font, left, top, width, height, text, html]`
#[derive(Debug, Clone, Deserialize)]
pub struct ElementFacts(
    pub String,
    pub String,
    pub String,
    pub String,
    pub f64,
    pub f64,
    pub f64,
    pub f64,
    pub Option<String>,
    pub Option<String>,
);

/// Everything the page reports about its elements, in document order
#[derive(Debug, Clone, Deserialize)]
pub struct RenderFacts {
    #[serde(rename = "scrollX", default)]
    pub scroll_x: f64,
    #[serde(rename = "scrollY", default)]
    pub scroll_y: f64,
    pub elements: Vec<ElementFacts>,
}

impl From<ElementFacts> for SnapshotNode {
    fn from(facts: ElementFacts) -> Self {
        let ElementFacts(display, color, background_color, font, x, y, width, height, text, html) =
            facts;
        SnapshotNode {
            client_rect: DomRect::new(x, y, width, height),
            computed_style: ComputedStyle {
                display,
                color,
                background_color,
                font,
            },
            text,
            outer_html: html,
        }
    }
}

/// Main DOM service
pub struct DomService {
    arena: DomArena,
}

impl DomService {
    pub fn new() -> Self {
        Self {
            arena: DomArena::new(),
        }
    }

    /// Wrap an existing arena
    pub fn from_arena(arena: DomArena) -> Self {
        Self { arena }
    }

    /// Get reference to internal arena
    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    /// Get mutable reference to internal arena
    pub fn arena_mut(&mut self) -> &mut DomArena {
        &mut self.arena
    }

    /// Parse CDP DOM tree response and build arena
    ///
    /// Input format matches CDP's DOM.getDocument response:
    /// ```json
    /// {
    ///   "root": {
    ///     "nodeId": 1,
    ///     "backendNodeId": 1,
    ///     "nodeType": 9,
    ///     "nodeName": "#document",
    ///     "children": [...]
    ///   }
    /// }
    /// ```
    ///
    /// Frame documents, shadow roots and pseudo elements are not children
    /// in this format and are left out.
    pub fn parse_cdp_dom_tree(&mut self, cdp_response: &Value) -> Result<NodeId> {
        let root = cdp_response
            .get("root")
            .ok_or_else(|| DomError::CdpError("Missing 'root' in CDP response".to_string()))?;

        self.arena.clear();
        let root_id = self.parse_node(root, None)?;
        self.arena.set_root(root_id)?;

        tracing::debug!(nodes = self.arena.len(), "parsed CDP document");
        Ok(root_id)
    }

    /// Recursively parse a CDP node
    fn parse_node(&mut self, cdp_node: &Value, parent_id: Option<NodeId>) -> Result<NodeId> {
        let backend_node_id = cdp_node["backendNodeId"]
            .as_u64()
            .ok_or_else(|| DomError::CdpError("Missing backendNodeId".to_string()))?
            as BackendNodeId;

        let node_type_val = cdp_node["nodeType"]
            .as_u64()
            .ok_or_else(|| DomError::CdpError("Missing nodeType".to_string()))?
            as u8;

        let node_type =
            NodeType::from_u8(node_type_val).ok_or_else(|| DomError::InvalidNodeType {
                expected: "valid NodeType".to_string(),
                actual: format!("{}", node_type_val),
            })?;

        let node_name = cdp_node["nodeName"].as_str().unwrap_or("").to_string();

        let mut node = DomNode::new(0, backend_node_id, node_type, node_name);
        node.local_name = cdp_node["localName"].as_str().unwrap_or("").to_string();
        node.node_value = cdp_node["nodeValue"].as_str().unwrap_or("").to_string();
        node.parent_id = parent_id;

        // Attributes arrive flattened: [name0, value0, name1, value1, ...]
        if let Some(attrs) = cdp_node["attributes"].as_array() {
            for pair in attrs.chunks_exact(2) {
                if let (Some(key), Some(value)) = (pair[0].as_str(), pair[1].as_str()) {
                    node.attributes.push((key.to_string(), value.to_string()));
                }
            }
        }

        let current_node_id = self.arena.add_node(node);

        if let Some(children) = cdp_node["children"].as_array() {
            let mut child_ids = smallvec::SmallVec::new();

            for child in children {
                let child_id = self.parse_node(child, Some(current_node_id))?;
                child_ids.push(child_id);
            }

            self.arena.get_mut(current_node_id)?.children_ids = child_ids;
        }

        Ok(current_node_id)
    }

    /// Merge render facts gathered by the page script
    ///
    /// Facts are matched to elements by document order, so the document
    /// must not have changed between the two captures.
    pub fn merge_render_facts(&mut self, facts: &Value) -> Result<()> {
        let facts = RenderFacts::deserialize(facts)?;
        let elements = self.arena.elements_in_order()?;

        if elements.len() != facts.elements.len() {
            return Err(DomError::SnapshotMismatch {
                elements: elements.len(),
                facts: facts.elements.len(),
            });
        }

        for (node_id, element_facts) in elements.into_iter().zip(facts.elements) {
            self.arena.get_mut(node_id)?.snapshot_node = Some(Box::new(element_facts.into()));
        }
        self.arena
            .set_scroll(ScrollOffset::new(facts.scroll_x, facts.scroll_y));

        tracing::debug!(
            scroll_x = facts.scroll_x,
            scroll_y = facts.scroll_y,
            "merged render facts"
        );
        Ok(())
    }

    /// Every element's record, keyed by backend node id
    pub fn snapshot(&self) -> Result<Vec<Record<BackendNodeId>>> {
        walk_document(&self.arena)?
            .into_iter()
            .map(|record| record.map_node(|id| self.backend_id(id)))
            .collect()
    }

    /// Backend node ids matching a path expression
    pub fn resolve(&self, expression: &str) -> Result<Vec<BackendNodeId>> {
        resolve(&self.arena, expression)?
            .into_iter()
            .map(|id| self.backend_id(id))
            .collect()
    }

    /// Snapshot path of one element
    pub fn path_of(&self, backend_id: BackendNodeId) -> Result<Option<String>> {
        let node_id = self
            .arena
            .get_node_id_by_backend(backend_id)
            .ok_or(DomError::NodeNotFound(backend_id))?;
        Ok(path_of(&self.arena, node_id))
    }

    /// Attribute map of one element
    pub fn attributes_of(&self, backend_id: BackendNodeId) -> Result<Attributes> {
        let node_id = self
            .arena
            .get_node_id_by_backend(backend_id)
            .ok_or(DomError::NodeNotFound(backend_id))?;
        Ok(extract_attributes(&self.arena, node_id))
    }

    fn backend_id(&self, node_id: NodeId) -> Result<BackendNodeId> {
        Ok(self.arena.get(node_id)?.backend_node_id)
    }
}

impl Default for DomService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cdp_document() -> Value {
        json!({
            "root": {
                "nodeId": 1,
                "backendNodeId": 1,
                "nodeType": 9,
                "nodeName": "#document",
                "nodeValue": "",
                "children": [{
                    "nodeId": 2,
                    "backendNodeId": 2,
                    "nodeType": 10,
                    "nodeName": "html",
                    "nodeValue": ""
                }, {
                    "nodeId": 3,
                    "backendNodeId": 3,
                    "nodeType": 1,
                    "nodeName": "HTML",
                    "localName": "html",
                    "nodeValue": "",
                    "attributes": ["lang", "en"],
                    "children": [{
                        "nodeId": 4,
                        "backendNodeId": 4,
                        "nodeType": 1,
                        "nodeName": "BODY",
                        "localName": "body",
                        "nodeValue": "",
                        "attributes": [],
                        "children": [{
                            "nodeId": 5,
                            "backendNodeId": 5,
                            "nodeType": 1,
                            "nodeName": "P",
                            "localName": "p",
                            "nodeValue": "",
                            "attributes": ["class", "lead", "id", "intro"],
                            "children": [{
                                "nodeId": 6,
                                "backendNodeId": 6,
                                "nodeType": 3,
                                "nodeName": "#text",
                                "nodeValue": "Hello"
                            }]
                        }, {
                            "nodeId": 7,
                            "backendNodeId": 7,
                            "nodeType": 8,
                            "nodeName": "#comment",
                            "nodeValue": "x"
                        }, {
                            "nodeId": 8,
                            "backendNodeId": 8,
                            "nodeType": 1,
                            "nodeName": "P",
                            "localName": "p",
                            "nodeValue": "",
                            "attributes": []
                        }]
                    }]
                }]
            }
        })
    }

    fn facts() -> Value {
        json!({
            "scrollX": 0,
            "scrollY": 250,
            "elements": [
                ["block", "rgb(0, 0, 0)", "rgb(255, 255, 255)", "16px Arial", 0, -250, 800, 1200, "Hello", null],
                ["block", "rgb(0, 0, 0)", "rgba(0, 0, 0, 0)", "16px Arial", 8, -242, 784, 40, "Hello", null],
                ["block", "rgb(1, 2, 3)", "rgba(0, 0, 0, 0)", "bold 16px Arial", 8, -234, 784, 20, "Hello", "<p class=\"lead\" id=\"intro\">Hello</p>"],
                ["none", "rgb(0, 0, 0)", "rgba(0, 0, 0, 0)", "16px Arial", 0, 0, 0, 0, "", "<p></p>"]
            ]
        })
    }

    #[test]
    fn test_parse_simple_dom() {
        let mut service = DomService::new();
        let root_id = service.parse_cdp_dom_tree(&cdp_document()).unwrap();

        assert_eq!(root_id, 0);
        assert_eq!(service.arena().len(), 8);

        let p = service.arena().get_by_backend_id(5).unwrap();
        assert_eq!(p.local_name, "p");
        assert_eq!(
            p.attributes,
            vec![
                ("class".to_string(), "lead".to_string()),
                ("id".to_string(), "intro".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_error() {
        let mut service = DomService::new();
        assert!(matches!(
            service.parse_cdp_dom_tree(&json!({})),
            Err(DomError::CdpError(_))
        ));
    }

    #[test]
    fn test_snapshot_after_merge() {
        let mut service = DomService::new();
        service.parse_cdp_dom_tree(&cdp_document()).unwrap();
        service.merge_render_facts(&facts()).unwrap();

        let records = service.snapshot().unwrap();
        let paths: Vec<_> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/html", "/html/body", "/html/body/p[1]", "/html/body/p[2]"]);

        let lead = &records[2];
        assert_eq!(lead.node, 5);
        assert_eq!((lead.x, lead.y), (8.0, 16.0));
        assert_eq!(lead.font, "bold 16px Arial");
        assert_eq!(lead.attributes.get("id"), Some("intro"));
        assert_eq!(lead.html, "<p class=\"lead\" id=\"intro\">Hello</p>");

        let hidden = &records[3];
        assert_eq!(hidden.node, 8);
        assert!(!hidden.visible);

        // html field falls back to serialized markup when the page gave none
        assert!(records[0].html.starts_with("<html lang=\"en\"><body>"));
    }

    #[test]
    fn test_resolve_and_path_of_by_backend_id() {
        let mut service = DomService::new();
        service.parse_cdp_dom_tree(&cdp_document()).unwrap();

        assert_eq!(service.resolve("/html/body/p[2]").unwrap(), vec![8]);
        assert_eq!(service.resolve("//p").unwrap(), vec![5, 8]);
        assert_eq!(service.path_of(5).unwrap().as_deref(), Some("/html/body/p[1]"));
        assert_eq!(service.path_of(6).unwrap(), None);
        assert!(service.path_of(99).is_err());
        assert_eq!(service.attributes_of(5).unwrap().get("class"), Some("lead"));
    }

    #[test]
    fn test_merge_rejects_mismatched_facts() {
        let mut service = DomService::new();
        service.parse_cdp_dom_tree(&cdp_document()).unwrap();

        let short = json!({ "scrollX": 0, "scrollY": 0, "elements": [] });
        assert!(matches!(
            service.merge_render_facts(&short),
            Err(DomError::SnapshotMismatch { elements: 4, facts: 0 })
        ));
    }
}
