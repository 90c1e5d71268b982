//! CDP Client - The Core Communication Layer
//!
//! Design decisions:
//! 1. Single WebSocket per browser connection (no per-session WS overhead)
//! 2. Async message passing - no locks on send/receive path
//! 3. Request/response matching via ID, events broadcast to subscribers
//! 4. Fail fast - no retries, no queuing. Let the caller decide.

use dashmap::DashMap;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::protocol::*;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Error, Debug)]
pub enum CDPError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CDP protocol error: {code} - {message}")]
    Protocol { code: i32, message: String },

    #[error("Request {0} timed out")]
    Timeout(RequestId),

    #[error("Connection closed")]
    Closed,

    #[error("Invalid response for request {0}")]
    InvalidResponse(RequestId),
}

/// Result type for CDP operations
pub type Result<T> = std::result::Result<T, CDPError>;

/// Event subscriber callback
pub type EventCallback = Arc<dyn Fn(CDPEvent) + Send + Sync>;

/// Requests without a caller-supplied deadline give up after this long
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type PendingMap = DashMap<RequestId, oneshot::Sender<CDPResponse>>;

/// Removes a request's slot when its caller stops waiting, however that
/// happens: response, timeout, send failure, or the future being dropped.
struct PendingSlot<'a> {
    pending: &'a PendingMap,
    id: RequestId,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

/// CDP Client - manages single WebSocket connection to browser
pub struct CDPClient {
    /// Monotonic request ID counter
    next_id: AtomicU64,

    /// Pending requests waiting for responses
    /// Key: request_id, Value: oneshot sender for response
    pending: Arc<PendingMap>,

    /// Event subscribers
    /// Key: method name (e.g., "Page.loadEventFired"), Value: callbacks
    subscribers: Arc<DashMap<String, Vec<EventCallback>>>,

    /// WebSocket write half (wrapped for concurrent sending)
    ws_sink: Arc<RwLock<WsSink>>,

    /// Stops the receiver task
    shutdown_tx: mpsc::Sender<()>,

    request_timeout: Duration,
}

impl CDPClient {
    /// Connect to Chrome DevTools Protocol endpoint
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
        Self::connect_with_timeout(ws_url, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Connect with a per-request response deadline
    pub async fn connect_with_timeout(ws_url: &str, request_timeout: Duration) -> Result<Arc<Self>> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (sink, mut stream) = ws_stream.split();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let client = Arc::new(Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
            subscribers: Arc::new(DashMap::new()),
            ws_sink: Arc::new(RwLock::new(sink)),
            shutdown_tx,
            request_timeout,
        });
        tracing::info!("Connected to {}", ws_url);

        // Spawn message receiver task
        let client_clone = client.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if let Err(e) = client_clone.handle_message(&text) {
                                    tracing::error!("Failed to handle message: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("WebSocket closed");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Shutdown signal received");
                        break;
                    }
                }
            }

            // Dropping the senders wakes every waiter with `Closed`
            client_clone.pending.clear();
        });

        Ok(client)
    }

    /// Send CDP request and wait for response
    pub async fn send_request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        session_id: Option<SessionId>,
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CDPRequest {
            id,
            method: method.into(),
            params,
            session_id,
        };
        tracing::trace!(id, method = %request.method, "CDP request");

        let json = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        let _slot = PendingSlot {
            pending: &self.pending,
            id,
        };

        let mut sink = self.ws_sink.write().await;
        sink.send(Message::Text(json)).await?;
        drop(sink); // Release lock immediately

        // Wait for response
        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(CDPError::Closed),
            Err(_) => return Err(CDPError::Timeout(id)),
        };

        if response.id != id {
            return Err(CDPError::InvalidResponse(id));
        }

        if let Some(error) = response.error {
            return Err(CDPError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Requests sent and still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Subscribe to CDP events
    pub fn subscribe(&self, method: impl Into<String>, callback: EventCallback) {
        let method = method.into();
        self.subscribers
            .entry(method)
            .or_insert_with(Vec::new)
            .push(callback);
    }

    /// Handle incoming WebSocket message
    fn handle_message(&self, text: &str) -> Result<()> {
        let msg: CDPMessage = serde_json::from_str(text)?;

        match msg {
            CDPMessage::Response(response) => {
                if let Some((_, tx)) = self.pending.remove(&response.id) {
                    let _ = tx.send(response); // Ignore send errors (receiver dropped)
                } else {
                    tracing::warn!("Received response for unknown request: {}", response.id);
                }
            }
            CDPMessage::Event(event) => {
                if let Some(subscribers) = self.subscribers.get(&event.method) {
                    for callback in subscribers.value() {
                        callback(event.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Close connection gracefully
    pub async fn close(self: Arc<Self>) -> Result<()> {
        let _ = self.shutdown_tx.send(()).await;
        let mut sink = self.ws_sink.write().await;
        sink.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::testing::{MockBrowser, Reply};
    use serde_json::json;

    #[tokio::test]
    async fn test_response_matched_by_id() {
        let browser = MockBrowser::start(|method, _| match method {
            "Browser.getVersion" => Reply::Result(json!({ "product": "Chrome/120" })),
            _ => Reply::Error("'Browser.getVersion' wasn't found".into()),
        })
        .await;
        let client = CDPClient::connect(&browser.url).await.unwrap();

        let result = client
            .send_request("Browser.getVersion", None, None)
            .await
            .unwrap();
        assert_eq!(result["product"], "Chrome/120");
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_protocol_error() {
        let browser = MockBrowser::start(|method, _| Reply::Error(format!("'{method}' wasn't found"))).await;
        let client = CDPClient::connect(&browser.url).await.unwrap();

        let err = client
            .send_request("Unknown.method", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CDPError::Protocol { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_abandoned_requests_release_their_slot() {
        let browser = MockBrowser::start(|_, _| Reply::Ignore).await;
        let client = CDPClient::connect(&browser.url).await.unwrap();

        for _ in 0..3 {
            let request = client.send_request("Runtime.evaluate", None, None);
            let outcome = tokio::time::timeout(Duration::from_millis(50), request).await;
            assert!(outcome.is_err());
        }
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_request_timeout_releases_slot() {
        let browser = MockBrowser::start(|_, _| Reply::Ignore).await;
        let client = CDPClient::connect_with_timeout(&browser.url, Duration::from_millis(50))
            .await
            .unwrap();

        let err = client
            .send_request("Runtime.evaluate", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CDPError::Timeout(_)));
        assert_eq!(client.pending_requests(), 0);
    }

    // Needs a running Chrome with --remote-debugging-port=9222

    #[tokio::test]
    #[ignore]
    async fn test_connect() {
        let client = CDPClient::connect("ws://localhost:9222/devtools/browser")
            .await
            .unwrap();

        let result = client
            .send_request("Browser.getVersion", None, None)
            .await
            .unwrap();

        assert!(result["userAgent"].is_string());
        client.close().await.unwrap();
    }
}
