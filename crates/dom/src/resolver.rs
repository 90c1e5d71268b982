//! Path resolution
//!
//! Turns a path expression back into node handles by draining the host's
//! ordered match cursor until it reports exhaustion.

use crate::error::Result;
use crate::host::PathEvaluator;

/// All nodes matching `expression`, in the order the host returns them.
///
/// No match is an empty list. An invalid expression is the host's error.
/// Every call is a fresh evaluation.
pub fn resolve<H: PathEvaluator>(host: &H, expression: &str) -> Result<Vec<H::Node>> {
    let mut matches = host.evaluate(expression)?;
    let mut nodes = Vec::new();

    while let Some(node) = matches.next() {
        nodes.push(node);
    }

    tracing::debug!(expression, matches = nodes.len(), "resolved path");
    Ok(nodes)
}
