//! Markup and text serialization for arena nodes
//!
//! Used when the page did not hand us its own `outerHTML` / rendered text
//! for a node (trees built in-process, or captured without render facts).
//! Output follows the HTML fragment serialization rules closely enough for
//! a snapshot: void elements have no end tag, raw-text elements are not
//! escaped.

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::{NodeId, NodeType};

/// Elements that never have an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text children are written verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Serialize a node and its descendants
pub fn outer_html(arena: &DomArena, node_id: NodeId) -> Result<String> {
    let mut output = String::with_capacity(256);
    serialize_node(arena, node_id, false, &mut output)?;
    Ok(output)
}

/// Concatenated value of every descendant text node
pub fn text_content(arena: &DomArena, node_id: NodeId) -> Result<String> {
    let mut text = String::new();

    arena.traverse_df(node_id, |node| {
        if node.node_type == NodeType::Text || node.node_type == NodeType::CdataSection {
            text.push_str(&node.node_value);
        }
        Ok(())
    })?;

    Ok(text)
}

fn serialize_node(
    arena: &DomArena,
    node_id: NodeId,
    raw_text: bool,
    output: &mut String,
) -> Result<()> {
    let node = arena.get(node_id)?;

    match node.node_type {
        NodeType::Element => {
            let name = node.markup_name();
            output.push('<');
            output.push_str(&name);

            for (attr_name, attr_value) in &node.attributes {
                output.push(' ');
                output.push_str(attr_name);
                output.push_str("=\"");
                escape_into(attr_value, true, output);
                output.push('"');
            }

            output.push('>');

            if VOID_ELEMENTS.contains(&name.as_str()) {
                return Ok(());
            }

            let raw = RAW_TEXT_ELEMENTS.contains(&name.as_str());
            for &child_id in &node.children_ids {
                serialize_node(arena, child_id, raw, output)?;
            }

            output.push_str("</");
            output.push_str(&name);
            output.push('>');
        }
        NodeType::Text | NodeType::CdataSection => {
            if raw_text {
                output.push_str(&node.node_value);
            } else {
                escape_into(&node.node_value, false, output);
            }
        }
        NodeType::Comment => {
            output.push_str("<!--");
            output.push_str(&node.node_value);
            output.push_str("-->");
        }
        NodeType::DocumentType => {
            output.push_str("<!DOCTYPE ");
            output.push_str(&node.node_name);
            output.push('>');
        }
        NodeType::Document | NodeType::DocumentFragment => {
            for &child_id in &node.children_ids {
                serialize_node(arena, child_id, false, output)?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn escape_into(value: &str, attribute: bool, output: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            '"' if attribute => output.push_str("&quot;"),
            '<' if !attribute => output.push_str("&lt;"),
            '>' if !attribute => output.push_str("&gt;"),
            _ => output.push(ch),
        }
    }
}
