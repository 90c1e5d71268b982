//! Scripted CDP endpoint for unit tests
//!
//! Speaks just enough of the wire format for `CDPClient`: every text frame
//! is a request, and the handler decides what (if anything) comes back.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

/// What the endpoint does with one request
pub enum Reply {
    Result(Value),
    Error(String),
    /// Never answer
    Ignore,
}

type Handler = Arc<dyn Fn(&str, &Value) -> Reply + Send + Sync>;

pub struct MockBrowser {
    pub url: String,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockBrowser {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let (mut sink, mut stream) = ws.split();

                    while let Some(Ok(Message::Text(text))) = stream.next().await {
                        let request: Value = serde_json::from_str(&text).unwrap();
                        let method = request["method"].as_str().unwrap_or_default().to_string();
                        let params = request["params"].clone();
                        log.lock().unwrap().push((method.clone(), params.clone()));

                        let response = match handler(&method, &params) {
                            Reply::Result(result) => json!({ "id": request["id"], "result": result }),
                            Reply::Error(message) => json!({
                                "id": request["id"],
                                "error": { "code": -32601, "message": message },
                            }),
                            Reply::Ignore => continue,
                        };
                        if sink.send(Message::Text(response.to_string())).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Self { url, requests }
    }

    /// A single tab: answers the attach handshake itself and hands every
    /// other method to `handler`.
    pub async fn tab<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
    {
        Self::start(move |method, params| match method {
            "Target.attachToTarget" => Reply::Result(json!({ "sessionId": "S1" })),
            "Target.getTargetInfo" => Reply::Result(json!({
                "targetInfo": {
                    "targetId": "T1",
                    "type": "page",
                    "title": "",
                    "url": "about:blank",
                    "attached": true,
                }
            })),
            m if m.ends_with(".enable") => Reply::Result(json!({})),
            _ => handler(method, params),
        })
        .await
    }

    /// Every request received so far, as (method, params)
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests().into_iter().map(|(method, _)| method).collect()
    }
}
