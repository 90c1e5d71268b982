//! Event Bus - Simple event system for browser events
//!
//! Design: Type-safe events over a broadcast channel.
//! No dynamic dispatch overhead - use enums, not trait objects.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Browser events that can be dispatched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrowserEvent {
    Started,
    Stopped,
    NavigationStarted { url: String },
    NavigationComplete { url: String },
    TabCreated { target_id: String },
    TabSwitched { target_id: String },
    SnapshotCaptured { target_id: String, records: usize },
    ImageCaptured { url: String, bytes: usize },
}

/// Simple event bus using tokio broadcast channel
pub struct EventBus {
    tx: broadcast::Sender<BrowserEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event
    pub fn publish(&self, event: BrowserEvent) {
        tracing::debug!(?event, "publish");
        let _ = self.tx.send(event); // Ignore error if no subscribers
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<BrowserEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(BrowserEvent::Started);
        bus.publish(BrowserEvent::SnapshotCaptured {
            target_id: "T1".to_string(),
            records: 42,
        });

        assert_eq!(rx.recv().await.unwrap(), BrowserEvent::Started);
        assert_eq!(
            rx.recv().await.unwrap(),
            BrowserEvent::SnapshotCaptured {
                target_id: "T1".to_string(),
                records: 42
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(BrowserEvent::Stopped);
    }
}
