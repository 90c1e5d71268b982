//! Error types for DOM operations
//!
//! Simple, flat error hierarchy. No over-engineering.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Document has no root node")]
    NoDocument,

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Invalid path expression {expression:?}: {reason}")]
    InvalidPath { expression: String, reason: String },

    #[error("CDP protocol error: {0}")]
    CdpError(String),

    #[error("Render facts do not match the tree: {elements} elements, {facts} facts")]
    SnapshotMismatch { elements: usize, facts: usize },

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
}
