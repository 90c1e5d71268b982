//! CDP Session - Represents a connection to a specific browser target
//!
//! Design: Lightweight wrapper around CDPClient with target-specific context.
//! All sessions share the same WebSocket - no per-session connection overhead.

use super::client::{CDPClient, CDPError, Result};
use super::protocol::{
    AttachToTargetResult, EvaluateResult, PropertyDescriptor, RemoteObject, SessionId, TargetId,
    TargetInfo,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Domains enabled on attach unless the caller names its own
pub const DEFAULT_DOMAINS: &[&str] = &["Page", "DOM", "Runtime", "Network"];

/// CDP Session bound to a specific target
#[derive(Clone)]
pub struct CDPSession {
    /// Shared CDP client
    client: Arc<CDPClient>,

    /// Target this session is attached to
    pub target_id: TargetId,

    /// Session ID assigned by Chrome
    pub session_id: SessionId,

    /// Cached target info
    pub title: String,
    pub url: String,
}

impl CDPSession {
    /// Attach to a target and create session
    pub async fn attach(
        client: Arc<CDPClient>,
        target_id: TargetId,
        domains: Option<Vec<&str>>,
    ) -> Result<Self> {
        let result = client
            .send_request(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true,
                })),
                None,
            )
            .await?;

        let attach_result: AttachToTargetResult = serde_json::from_value(result)?;
        let session_id = attach_result.session_id;

        let domains = domains.unwrap_or_else(|| DEFAULT_DOMAINS.to_vec());

        // Enable all domains in parallel
        let enable_futures: Vec<_> = domains
            .into_iter()
            .map(|domain| {
                let client = client.clone();
                let session_id = session_id.clone();
                async move {
                    client
                        .send_request(format!("{}.enable", domain), None, Some(session_id))
                        .await
                }
            })
            .collect();

        // Wait for all enables (ignore individual failures)
        let results = futures_util::future::join_all(enable_futures).await;
        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            tracing::warn!("Some domain enables failed: {}/{}", failures, results.len());
        }

        let mut session = Self {
            client,
            target_id,
            session_id,
            title: String::new(),
            url: String::new(),
        };
        session.refresh_target_info().await?;

        Ok(session)
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        self.client
            .send_request(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Get current target info
    pub async fn get_target_info(&self) -> Result<TargetInfo> {
        let result = self
            .client
            .send_request(
                "Target.getTargetInfo",
                Some(json!({ "targetId": &self.target_id })),
                None,
            )
            .await?;

        Ok(serde_json::from_value(result["targetInfo"].clone())?)
    }

    /// Re-read title and URL (they change on navigation)
    pub async fn refresh_target_info(&mut self) -> Result<()> {
        let info = self.get_target_info().await?;
        self.title = info.title;
        self.url = info.url;
        Ok(())
    }

    /// Navigate to URL
    pub async fn navigate(&self, url: impl Into<String>) -> Result<Value> {
        self.send("Page.navigate", Some(json!({ "url": url.into() })))
            .await
    }

    /// Evaluate JavaScript, returning the value by value
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<EvaluateResult> {
        self.evaluate_with(expression, true, false).await
    }

    /// Evaluate JavaScript with explicit result handling.
    ///
    /// `return_by_value = false` yields a remote object id; `await_promise`
    /// waits for a returned promise to settle.
    pub async fn evaluate_with(
        &self,
        expression: impl Into<String>,
        return_by_value: bool,
        await_promise: bool,
    ) -> Result<EvaluateResult> {
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression.into(),
                    "returnByValue": return_by_value,
                    "awaitPromise": await_promise,
                })),
            )
            .await?;

        Ok(serde_json::from_value(result)?)
    }

    /// Own properties of a remote object
    pub async fn get_properties(&self, object_id: &str) -> Result<Vec<PropertyDescriptor>> {
        let result = self
            .send(
                "Runtime.getProperties",
                Some(json!({ "objectId": object_id, "ownProperties": true })),
            )
            .await?;

        Ok(serde_json::from_value(result["result"].clone())?)
    }

    /// Backend node id of a remote DOM object
    pub async fn backend_node_id(&self, object_id: &str) -> Result<u32> {
        let result = self
            .send("DOM.describeNode", Some(json!({ "objectId": object_id })))
            .await?;

        result["node"]["backendNodeId"]
            .as_u64()
            .map(|id| id as u32)
            .ok_or(CDPError::Protocol {
                code: -1,
                message: "DOM.describeNode returned no backendNodeId".to_string(),
            })
    }

    /// Evaluate JavaScript keeping the result as a remote object in
    /// `object_group`. Release the group when done with it.
    pub async fn evaluate_in_group(
        &self,
        expression: impl Into<String>,
        object_group: &str,
    ) -> Result<EvaluateResult> {
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression.into(),
                    "returnByValue": false,
                    "objectGroup": object_group,
                })),
            )
            .await?;

        Ok(serde_json::from_value(result)?)
    }

    /// Call `function_declaration` with the remote object as `this`,
    /// returning the value by value
    pub async fn call_function_on(
        &self,
        object_id: &str,
        function_declaration: &str,
    ) -> Result<EvaluateResult> {
        let result = self
            .send(
                "Runtime.callFunctionOn",
                Some(json!({
                    "objectId": object_id,
                    "functionDeclaration": function_declaration,
                    "returnByValue": true,
                })),
            )
            .await?;

        Ok(serde_json::from_value(result)?)
    }

    /// Remote object for a backend node. Fails once the node is gone.
    pub async fn resolve_node(&self, backend_node_id: u32, object_group: &str) -> Result<RemoteObject> {
        let result = self
            .send(
                "DOM.resolveNode",
                Some(json!({ "backendNodeId": backend_node_id, "objectGroup": object_group })),
            )
            .await?;

        Ok(serde_json::from_value(result["object"].clone())?)
    }

    /// Release every remote object in `object_group`, including objects
    /// derived from them (e.g. through `Runtime.getProperties`)
    pub async fn release_object_group(&self, object_group: &str) -> Result<()> {
        self.send(
            "Runtime.releaseObjectGroup",
            Some(json!({ "objectGroup": object_group })),
        )
        .await?;
        Ok(())
    }
}
