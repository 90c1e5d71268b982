//! Browser Session Management
//!
//! High-level API for the harness: connect to a running browser, open and
//! switch tabs, navigate, and hand out `Page`s for snapshots.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use domwalk::{BackendNodeId, Record};
use serde_json::json;

use crate::cdp::protocol::TargetId;
use crate::cdp::{CDPClient, CDPSession};
use crate::error::{BrowserError, Result};
use crate::events::{BrowserEvent, EventBus};
use crate::page::{Page, PageTimeouts};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub id: String,
    pub cdp_url: String,
    pub window_width: u32,
    pub window_height: u32,
    pub image_timeout_ms: u64,
    pub ready_poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            cdp_url: "ws://localhost:9222".to_string(),
            window_width: 1200,
            window_height: 800,
            image_timeout_ms: 30_000,
            ready_poll_interval_ms: 100,
        }
    }
}

impl SessionConfig {
    pub fn page_timeouts(&self) -> PageTimeouts {
        PageTimeouts {
            image_capture: Duration::from_millis(self.image_timeout_ms),
            ready_poll_interval: Duration::from_millis(self.ready_poll_interval_ms),
        }
    }
}

/// Browser Session - manages connection to Chrome and tabs
pub struct BrowserSession {
    pub config: SessionConfig,
    pub event_bus: EventBus,

    // CDP infrastructure
    cdp_client: Arc<RwLock<Option<Arc<CDPClient>>>>,
    sessions: Arc<RwLock<HashMap<TargetId, CDPSession>>>,

    // Current focus
    current_target: Arc<RwLock<Option<TargetId>>>,
}

impl BrowserSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            event_bus: EventBus::new(),
            cdp_client: Arc::new(RwLock::new(None)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            current_target: Arc::new(RwLock::new(None)),
        }
    }

    /// Connect to the browser's CDP endpoint
    pub async fn start(&self) -> Result<()> {
        let client = CDPClient::connect(&self.config.cdp_url).await?;
        *self.cdp_client.write().await = Some(client);

        tracing::info!(session = %self.config.id, "browser session started");
        self.event_bus.publish(BrowserEvent::Started);
        Ok(())
    }

    /// Drop all tab sessions and close the connection
    pub async fn stop(&self) -> Result<()> {
        self.sessions.write().await.clear();
        *self.current_target.write().await = None;

        if let Some(client) = self.cdp_client.write().await.take() {
            client.close().await?;
        }

        tracing::info!(session = %self.config.id, "browser session stopped");
        self.event_bus.publish(BrowserEvent::Stopped);
        Ok(())
    }

    async fn client(&self) -> Result<Arc<CDPClient>> {
        self.cdp_client
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(BrowserError::NotConnected)
    }

    /// Create new tab sized to the configured window and focus it
    pub async fn new_tab(&self, url: Option<String>) -> Result<TargetId> {
        let client = self.client().await?;
        let url = url.unwrap_or_else(|| "about:blank".to_string());

        let result = client
            .send_request("Target.createTarget", Some(json!({ "url": url })), None)
            .await?;

        let target_id: TargetId = result["targetId"]
            .as_str()
            .ok_or_else(|| BrowserError::InvalidResponse("Invalid targetId".into()))?
            .to_string();

        let session = CDPSession::attach(client, target_id.clone(), None).await?;
        session
            .send(
                "Emulation.setDeviceMetricsOverride",
                Some(json!({
                    "width": self.config.window_width,
                    "height": self.config.window_height,
                    "deviceScaleFactor": 0,
                    "mobile": false,
                })),
            )
            .await?;

        self.sessions
            .write()
            .await
            .insert(target_id.clone(), session);
        *self.current_target.write().await = Some(target_id.clone());

        self.event_bus.publish(BrowserEvent::TabCreated {
            target_id: target_id.clone(),
        });
        Ok(target_id)
    }

    /// Switch to tab
    pub async fn switch_tab(&self, target_id: TargetId) -> Result<()> {
        if !self.sessions.read().await.contains_key(&target_id) {
            return Err(BrowserError::TargetNotFound(target_id));
        }

        *self.current_target.write().await = Some(target_id.clone());
        self.event_bus.publish(BrowserEvent::TabSwitched { target_id });
        Ok(())
    }

    /// Get current session
    pub async fn current_session(&self) -> Option<CDPSession> {
        let target_id = self.current_target.read().await.clone()?;
        self.sessions.read().await.get(&target_id).cloned()
    }

    /// Page facade for the focused tab
    pub async fn page(&self) -> Result<Page> {
        let session = self
            .current_session()
            .await
            .ok_or(BrowserError::NoActiveSession)?;
        Ok(Page::new(session, self.config.page_timeouts()))
    }

    /// Navigate current tab
    pub async fn navigate(&self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        let target_id = self
            .current_target
            .read()
            .await
            .clone()
            .ok_or(BrowserError::NoActiveSession)?;

        self.event_bus
            .publish(BrowserEvent::NavigationStarted { url: url.clone() });

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&target_id)
            .ok_or_else(|| BrowserError::TargetNotFound(target_id.clone()))?;
        session.navigate(&url).await?;
        session.refresh_target_info().await?;
        drop(sessions);

        self.event_bus
            .publish(BrowserEvent::NavigationComplete { url });
        Ok(())
    }

    /// Snapshot the focused tab
    pub async fn snapshot(&self) -> Result<Vec<Record<BackendNodeId>>> {
        let page = self.page().await?;
        let records = page.get_everything().await?;

        self.event_bus.publish(BrowserEvent::SnapshotCaptured {
            target_id: page.session().target_id.clone(),
            records: records.len(),
        });
        Ok(records)
    }

    /// Capture an image through the focused tab
    pub async fn capture_image(&self, url: &str) -> Result<Option<String>> {
        let captured = self.page().await?.capture_image(url).await?;

        if let Some(data) = &captured {
            self.event_bus.publish(BrowserEvent::ImageCaptured {
                url: url.to_string(),
                bytes: data.len(),
            });
        }
        Ok(captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config: SessionConfig =
            serde_json::from_value(json!({ "cdp_url": "ws://127.0.0.1:9333", "window_width": 1024 }))
                .unwrap();

        assert_eq!(config.cdp_url, "ws://127.0.0.1:9333");
        assert_eq!(config.window_width, 1024);
        assert_eq!(config.window_height, 800);
        assert_eq!(
            config.page_timeouts().image_capture,
            Duration::from_secs(30)
        );
        assert!(Uuid::parse_str(&config.id).is_ok());
    }

    #[tokio::test]
    async fn test_requires_connection_and_tab() {
        let session = BrowserSession::new(SessionConfig::default());

        assert!(matches!(
            session.new_tab(None).await,
            Err(BrowserError::NotConnected)
        ));
        assert!(matches!(
            session.page().await,
            Err(BrowserError::NoActiveSession)
        ));
        assert!(matches!(
            session.switch_tab("missing".into()).await,
            Err(BrowserError::TargetNotFound(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Needs running Chrome
    async fn test_session_lifecycle() {
        let session = BrowserSession::new(SessionConfig::default());
        session.start().await.unwrap();

        session
            .new_tab(Some("data:text/html,<div>a</div><div>b</div><span>c</span>".into()))
            .await
            .unwrap();
        let page = session.page().await.unwrap();
        page.wait_until_ready(Duration::from_secs(10)).await.unwrap();

        let records = session.snapshot().await.unwrap();
        let paths: Vec<_> = records.iter().map(|r| r.path.as_str()).collect();
        assert!(paths.contains(&"/html/body/div[2]"));
        assert!(paths.contains(&"/html/body/span"));

        for record in &records {
            assert_eq!(page.resolve(&record.path).await.unwrap(), vec![record.node]);
        }
        assert!(page.resolve("/nonexistent-tag").await.unwrap().is_empty());
        assert!(matches!(
            page.resolve("/html[").await,
            Err(BrowserError::Script(_))
        ));

        session.stop().await.unwrap();
    }
}
