//! Page - the harness entry points for one attached tab
//!
//! - `get_everything`: snapshot every element (walk in Rust over a captured arena)
//! - `resolve`: live path resolution through the page's own evaluator
//! - `capture_image`: fetch an image in page context into a hidden element
//!
//! Node handles are CDP backend node ids. They stay meaningful only while
//! the page's document is unchanged.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use domwalk::{Attributes, BackendNodeId, DomService, Record};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cdp::protocol::EvaluateResult;
use crate::cdp::{CDPError, CDPSession};
use crate::error::{BrowserError, Result};
use crate::scripts;

/// Timing knobs for page operations
#[derive(Debug, Clone, Copy)]
pub struct PageTimeouts {
    pub image_capture: Duration,
    pub ready_poll_interval: Duration,
}

impl Default for PageTimeouts {
    fn default() -> Self {
        Self {
            image_capture: Duration::from_secs(30),
            ready_poll_interval: Duration::from_millis(100),
        }
    }
}

/// One attached tab
#[derive(Clone)]
pub struct Page {
    session: CDPSession,
    timeouts: PageTimeouts,
}

impl Page {
    pub fn new(session: CDPSession, timeouts: PageTimeouts) -> Self {
        Self { session, timeouts }
    }

    pub fn session(&self) -> &CDPSession {
        &self.session
    }

    /// Capture the document tree plus render facts into a service
    pub async fn capture_dom(&self) -> Result<DomService> {
        let document = self
            .session
            .send("DOM.getDocument", Some(json!({ "depth": -1 })))
            .await?;
        let facts = self.evaluate_value(scripts::RENDER_FACTS).await?;

        let mut service = DomService::new();
        service.parse_cdp_dom_tree(&document)?;
        service.merge_render_facts(&facts)?;
        Ok(service)
    }

    /// Every element of the current document, in document order
    pub async fn get_everything(&self) -> Result<Vec<Record<BackendNodeId>>> {
        let records = self.capture_dom().await?.snapshot()?;
        tracing::info!(
            target_id = %self.session.target_id,
            records = records.len(),
            "captured snapshot"
        );
        Ok(records)
    }

    /// Nodes matching `expression` in the live document, in document order
    pub async fn resolve(&self, expression: &str) -> Result<Vec<BackendNodeId>> {
        let group = object_group("resolve");
        let nodes = self.resolve_in_group(expression, &group).await;
        if let Err(e) = self.session.release_object_group(&group).await {
            tracing::warn!("Failed to release resolve objects: {}", e);
        }
        nodes
    }

    async fn resolve_in_group(&self, expression: &str, group: &str) -> Result<Vec<BackendNodeId>> {
        let result = self
            .session
            .evaluate_in_group(scripts::resolve_path(expression), group)
            .await?;
        let array = checked(result)?;
        let object_id = array
            .object_id
            .ok_or_else(|| BrowserError::InvalidResponse("resolve returned no object".into()))?;

        self.array_nodes(&object_id).await
    }

    async fn array_nodes(&self, object_id: &str) -> Result<Vec<BackendNodeId>> {
        let mut indexed: Vec<(usize, String)> = self
            .session
            .get_properties(object_id)
            .await?
            .into_iter()
            .filter_map(|prop| {
                let index = prop.name.parse::<usize>().ok()?;
                let id = prop.value?.object_id?;
                Some((index, id))
            })
            .collect();
        indexed.sort_by_key(|(index, _)| *index);

        let mut nodes = Vec::with_capacity(indexed.len());
        for (_, element_id) in indexed {
            nodes.push(self.session.backend_node_id(&element_id).await?);
        }
        Ok(nodes)
    }

    /// Snapshot path of one node, as `get_everything` would assign it
    pub async fn path_of(&self, node: BackendNodeId) -> Result<Option<String>> {
        Ok(self.capture_dom().await?.path_of(node)?)
    }

    /// Current attributes of one node
    pub async fn attributes_of(&self, node: BackendNodeId) -> Result<Attributes> {
        let result = self
            .session
            .send("DOM.describeNode", Some(json!({ "backendNodeId": node })))
            .await?;

        let flat = result["node"]["attributes"].as_array().cloned().unwrap_or_default();
        Ok(flat
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_str()?, pair[1].as_str()?)))
            .collect())
    }

    /// Fetch an image through the page and return it as a data URL.
    ///
    /// Relative sources resolve against the document's base URI at fetch
    /// time. The encoded image is also left in the hidden
    /// `#base64imagedownload` element. `Ok(None)` when the fetch does not
    /// complete in time.
    pub async fn capture_image(&self, src: &str) -> Result<Option<String>> {
        let script = scripts::capture_image(src);

        let completion = self.session.evaluate_with(script, true, true);
        match tokio::time::timeout(self.timeouts.image_capture, completion).await {
            Ok(result) => {
                checked(result?)?;
            }
            Err(_) => {
                tracing::warn!(src, "image capture did not complete");
                return Ok(None);
            }
        }

        let stored = self.evaluate_value(&scripts::read_image_holder()).await?;
        Ok(stored.as_str().map(str::to_string))
    }

    pub async fn user_agent(&self) -> Result<String> {
        let value = self.evaluate_value(scripts::USER_AGENT).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::InvalidResponse("userAgent is not a string".into()))
    }

    /// Cookies visible to the page, name → value
    ///
    /// Falls back to `document.cookie` when the browser reports none.
    pub async fn cookies(&self) -> Result<HashMap<String, String>> {
        let result = self.session.send("Network.getCookies", None).await?;
        let cookies: HashMap<String, String> = result["cookies"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|c| Some((c["name"].as_str()?.to_string(), c["value"].as_str()?.to_string())))
            .collect();

        if !cookies.is_empty() {
            return Ok(cookies);
        }

        let value = self.evaluate_value(scripts::DOCUMENT_COOKIE).await?;
        Ok(parse_cookie_string(value.as_str().unwrap_or("")))
    }

    /// `document.readyState === "complete"`
    pub async fn is_ready(&self) -> Result<bool> {
        Ok(self.evaluate_value(scripts::READY_STATE).await?.as_bool() == Some(true))
    }

    /// Poll `is_ready` until it holds or `timeout` elapses
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        poll_until(self.timeouts.ready_poll_interval, timeout, "document ready", || {
            self.is_ready()
        })
        .await
    }

    /// Whether `node` is gone from the document
    pub async fn is_detached(&self, node: BackendNodeId) -> Result<bool> {
        let group = object_group("detach");
        let object = match self.session.resolve_node(node, &group).await {
            Ok(object) => object,
            // the backend no longer knows the node
            Err(CDPError::Protocol { .. }) => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        let Some(object_id) = object.object_id else {
            return Ok(true);
        };

        let connected = self
            .session
            .call_function_on(&object_id, scripts::IS_CONNECTED)
            .await;
        if let Err(e) = self.session.release_object_group(&group).await {
            tracing::warn!("Failed to release node object: {}", e);
        }

        Ok(checked(connected?)?.value != Some(Value::Bool(true)))
    }

    /// Poll `is_detached` until `node` leaves the document or `timeout`
    /// elapses
    pub async fn wait_until_detached(&self, node: BackendNodeId, timeout: Duration) -> Result<()> {
        poll_until(self.timeouts.ready_poll_interval, timeout, "node to detach", || {
            self.is_detached(node)
        })
        .await
    }

    /// Markup of the document as currently rendered
    pub async fn rendered_html(&self) -> Result<String> {
        let value = self.evaluate_value(scripts::RENDERED_HTML).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::InvalidResponse("outerHTML is not a string".into()))
    }

    pub async fn save_rendered_html(&self, path: impl AsRef<Path>) -> Result<()> {
        let html = self.rendered_html().await?;
        tokio::fs::write(path, html.as_bytes()).await?;
        Ok(())
    }

    async fn evaluate_value(&self, expression: &str) -> Result<Value> {
        let result = self.session.evaluate(expression).await?;
        Ok(checked(result)?.value.unwrap_or(Value::Null))
    }
}

/// Remote object group unique to one call
fn object_group(purpose: &str) -> String {
    format!("domwalk-{purpose}-{}", Uuid::now_v7())
}

/// Run `check` every `interval` until it returns true. Fails with
/// `BrowserError::Timeout` after `timeout`; errors from `check` end the wait.
async fn poll_until<F, Fut>(interval: Duration, timeout: Duration, what: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let poll = async {
        loop {
            if check().await? {
                return Ok::<(), BrowserError>(());
            }
            tokio::time::sleep(interval).await;
        }
    };

    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| BrowserError::Timeout(what.to_string()))?
}

/// Surface a thrown page exception as an error
fn checked(result: EvaluateResult) -> Result<crate::cdp::RemoteObject> {
    match result.exception_details {
        Some(details) => Err(BrowserError::Script(details.message())),
        None => Ok(result.result),
    }
}

/// Parse a `document.cookie` string ("a=1; b=2")
pub fn parse_cookie_string(cookies: &str) -> HashMap<String, String> {
    cookies
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
