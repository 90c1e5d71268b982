//! Tree walker
//!
//! Visits every element in document order and gives each one a path that
//! the resolver can turn back into that same element:
//!
//! ```text
//! body
//!  ├─ div      → /html/body/div[1]
//!  ├─ #text    (no record, no index)
//!  ├─ div      → /html/body/div[2]
//!  └─ span     → /html/body/span
//! ```
//!
//! A segment is indexed only when its tag is shared with another sibling.
//! The index is the 1-based rank among those same-tag siblings by child
//! position.

use crate::host::DocumentHost;
use crate::record::{build_record, Record};
use ahash::AHashMap;
use smallvec::SmallVec;

/// Tag → child positions, for one parent's children only
type SiblingIndex = AHashMap<String, SmallVec<[usize; 4]>>;

/// Snapshot the whole document.
pub fn walk_document<H: DocumentHost>(host: &H) -> crate::Result<Vec<Record<H::Node>>> {
    let records = walk(host, host.document()?, "");
    tracing::debug!(records = records.len(), "walked document");
    Ok(records)
}

/// Records for every element below `root`, pre-order.
///
/// Each call returns its own list; the caller concatenates.
pub fn walk<H: DocumentHost>(host: &H, root: H::Node, base_path: &str) -> Vec<Record<H::Node>> {
    let children = host.children(root);
    let tags: Vec<Option<String>> = children
        .iter()
        .map(|&child| host.tag_name(child).map(str::to_ascii_lowercase))
        .collect();

    let siblings = sibling_index(&tags);
    let mut records = Vec::new();

    for (position, (&child, tag)) in children.iter().zip(&tags).enumerate() {
        let Some(tag) = tag else {
            continue;
        };

        let path = format!("{base_path}{}", segment(tag, &siblings[tag], position));
        records.push(build_record(host, child, &path));
        records.extend(walk(host, child, &path));
    }

    records
}

/// Path of a single element, computed from its ancestors.
///
/// Matches what `walk_document` assigns to the same node. `None` for
/// untagged nodes and nodes not attached under the document.
pub fn path_of<H: DocumentHost>(host: &H, node: H::Node) -> Option<String> {
    let document = host.document().ok()?;
    let mut segments = Vec::new();
    let mut current = node;

    while current != document {
        let parent = host.parent(current)?;
        let children = host.children(parent);
        let tags: Vec<Option<String>> = children
            .iter()
            .map(|&child| host.tag_name(child).map(str::to_ascii_lowercase))
            .collect();
        let position = children.iter().position(|&child| child == current)?;
        let tag = tags[position].as_deref()?;

        let siblings = sibling_index(&tags);
        segments.push(segment(tag, &siblings[tag], position));
        current = parent;
    }

    if segments.is_empty() {
        return None;
    }
    segments.reverse();
    Some(segments.concat())
}

fn sibling_index(tags: &[Option<String>]) -> SiblingIndex {
    let mut index = SiblingIndex::default();
    for (position, tag) in tags.iter().enumerate() {
        if let Some(tag) = tag {
            index.entry(tag.clone()).or_default().push(position);
        }
    }
    index
}

fn segment(tag: &str, positions: &[usize], position: usize) -> String {
    if positions.len() > 1 {
        // positions are pushed in child order, so they are sorted
        let rank = positions.binary_search(&position).unwrap_or_default();
        format!("/{tag}[{}]", rank + 1)
    } else {
        format!("/{tag}")
    }
}
