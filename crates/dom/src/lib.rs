//! DOM snapshot engine
//!
//! Enumerates every element of a rendered document together with a
//! positional path that re-locates it, and resolves such paths back into
//! nodes.
//!
//! ## Core Design
//!
//! ```text
//! CDP JSON → DomArena (owned) ─┐
//!                              ├─ DocumentHost ─→ walk_document → Vec<Record>
//! render facts ────────────────┘                  resolve(path)  → Vec<Node>
//! ```
//!
//! The walker and resolver only see the `DocumentHost` / `PathEvaluator`
//! traits. `DomArena` is the in-process host.
#![recursion_limit = "256"]

pub mod arena;
pub mod attributes;
pub mod error;
pub mod host;
pub mod record;
pub mod resolver;
pub mod serializer;
pub mod service;
pub mod types;
pub mod walker;
pub mod xpath;

pub use arena::DomArena;
pub use attributes::{extract_attributes, Attributes};
pub use error::{DomError, Result};
pub use host::{DocumentHost, PathEvaluator};
pub use record::{build_record, Record};
pub use resolver::resolve;
pub use service::DomService;
pub use types::*;
pub use walker::{path_of, walk, walk_document};
pub use xpath::PathExpr;
