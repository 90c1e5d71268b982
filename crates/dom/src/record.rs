//! Snapshot records
//!
//! One `Record` per element: where it is in the tree, where it is on the
//! page, and what it looks like. Building one is a pure read of the host.

use crate::attributes::{extract_attributes, Attributes};
use crate::host::DocumentHost;
use serde::ser::{Serialize, SerializeTuple, Serializer};

/// Number of positions in the serialized tuple
pub const RECORD_FIELDS: usize = 13;

/// Snapshot of one element.
///
/// Serialized as a fixed-position array:
/// `[node, path, visible(0|1), x, y, width, height, fg, bg, font, attributes, text, html]`
#[derive(Debug, Clone, PartialEq)]
pub struct Record<N> {
    pub node: N,
    pub path: String,
    pub visible: bool,
    /// Page-absolute coordinates
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub foreground_color: String,
    pub background_color: String,
    pub font: String,
    pub attributes: Attributes,
    pub text: String,
    pub html: String,
}

impl<N> Record<N> {
    /// Swap the node handle, e.g. arena index → backend node id
    pub fn map_node<M, E>(self, f: impl FnOnce(N) -> Result<M, E>) -> Result<Record<M>, E> {
        Ok(Record {
            node: f(self.node)?,
            path: self.path,
            visible: self.visible,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            foreground_color: self.foreground_color,
            background_color: self.background_color,
            font: self.font,
            attributes: self.attributes,
            text: self.text,
            html: self.html,
        })
    }
}

impl<N: Serialize> Serialize for Record<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(RECORD_FIELDS)?;
        tuple.serialize_element(&self.node)?;
        tuple.serialize_element(&self.path)?;
        tuple.serialize_element(&u8::from(self.visible))?;
        tuple.serialize_element(&self.x)?;
        tuple.serialize_element(&self.y)?;
        tuple.serialize_element(&self.width)?;
        tuple.serialize_element(&self.height)?;
        tuple.serialize_element(&self.foreground_color)?;
        tuple.serialize_element(&self.background_color)?;
        tuple.serialize_element(&self.font)?;
        tuple.serialize_element(&self.attributes)?;
        tuple.serialize_element(&self.text)?;
        tuple.serialize_element(&self.html)?;
        tuple.end()
    }
}

/// Assemble the record for `element` at `path`.
///
/// The element must be attached and laid out; otherwise geometry and style
/// come back as whatever defaults the host reports.
pub fn build_record<H: DocumentHost>(host: &H, element: H::Node, path: &str) -> Record<H::Node> {
    let scroll = host.scroll_offset();
    let rect = host.client_rect(element).offset(scroll.x, scroll.y);
    let style = host.computed_style(element);

    Record {
        node: element,
        path: path.to_string(),
        visible: style.is_displayed(),
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        foreground_color: style.color,
        background_color: style.background_color,
        font: style.font,
        attributes: extract_attributes(host, element),
        text: host.text(element),
        html: host.outer_html(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::DomArena;
    use crate::types::{ComputedStyle, DomRect, ScrollOffset, SnapshotNode};

    fn styled(display: &str) -> SnapshotNode {
        SnapshotNode {
            client_rect: DomRect::new(10.0, 20.0, 300.0, 40.0),
            computed_style: ComputedStyle {
                display: display.to_string(),
                color: "rgb(0, 0, 0)".to_string(),
                background_color: "rgba(0, 0, 0, 0)".to_string(),
                font: "16px serif".to_string(),
            },
            text: Some("Rendered".to_string()),
            outer_html: Some("<p id=\"x\">Rendered</p>".to_string()),
        }
    }

    #[test]
    fn test_build_record_adds_scroll() {
        let mut arena = DomArena::with_document();
        let root = arena.root_id().unwrap();
        let p = arena.append_element(root, "p").unwrap();
        {
            let node = arena.get_mut(p).unwrap();
            node.set_attr("id", "x");
            node.snapshot_node = Some(Box::new(styled("block")));
        }
        arena.set_scroll(ScrollOffset::new(5.0, 1000.0));

        let record = build_record(&arena, p, "/p");

        assert_eq!(record.node, p);
        assert_eq!(record.path, "/p");
        assert!(record.visible);
        assert_eq!((record.x, record.y), (15.0, 1020.0));
        assert_eq!((record.width, record.height), (300.0, 40.0));
        assert_eq!(record.foreground_color, "rgb(0, 0, 0)");
        assert_eq!(record.background_color, "rgba(0, 0, 0, 0)");
        assert_eq!(record.font, "16px serif");
        assert_eq!(record.attributes.get("id"), Some("x"));
        assert_eq!(record.text, "Rendered");
        assert_eq!(record.html, "<p id=\"x\">Rendered</p>");
    }

    #[test]
    fn test_only_display_none_is_invisible() {
        let mut arena = DomArena::with_document();
        let root = arena.root_id().unwrap();
        let hidden = arena.append_element(root, "div").unwrap();
        let faded = arena.append_element(root, "div").unwrap();

        arena.get_mut(hidden).unwrap().snapshot_node = Some(Box::new(styled("none")));
        let mut zero = styled("block");
        zero.client_rect = DomRect::zero();
        arena.get_mut(faded).unwrap().snapshot_node = Some(Box::new(zero));
        arena.get_mut(faded).unwrap().set_attr("style", "opacity: 0; visibility: hidden");

        assert!(!build_record(&arena, hidden, "/div[1]").visible);
        assert!(build_record(&arena, faded, "/div[2]").visible);
    }

    #[test]
    fn test_record_serializes_as_tuple() {
        let mut arena = DomArena::with_document();
        let root = arena.root_id().unwrap();
        let p = arena.append_element(root, "p").unwrap();
        {
            let node = arena.get_mut(p).unwrap();
            node.set_attr("id", "x");
            node.snapshot_node = Some(Box::new(styled("none")));
        }

        let value = serde_json::to_value(build_record(&arena, p, "/p")).unwrap();
        let fields = value.as_array().unwrap();

        assert_eq!(fields.len(), RECORD_FIELDS);
        assert_eq!(fields[0], serde_json::json!(p));
        assert_eq!(fields[1], "/p");
        assert_eq!(fields[2], 0);
        assert_eq!(fields[3], 10.0);
        assert_eq!(fields[6], 40.0);
        assert_eq!(fields[9], "16px serif");
        assert_eq!(fields[10], serde_json::json!({ "id": "x" }));
        assert_eq!(fields[11], "Rendered");
    }

    #[test]
    fn test_map_node() {
        let mut arena = DomArena::with_document();
        let root = arena.root_id().unwrap();
        let p = arena.append_element(root, "p").unwrap();

        let record = build_record(&arena, p, "/p")
            .map_node(|id| arena.get(id).map(|n| n.backend_node_id))
            .unwrap();
        assert_eq!(record.node, arena.get(p).unwrap().backend_node_id);
        assert_eq!(record.path, "/p");
    }
}
