use crate::models::{Match, SwipeRecord};
use serde::Serialize;
use tokio::sync::broadcast;

/// Notifications for downstream collaborators (push, analytics)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    MatchCreated(Match),
    SwipeRecorded(SwipeRecord),
}

/// Fire-and-forget event fan-out
///
/// Publishing never waits on subscribers; a slow subscriber lags and loses
/// the oldest events instead of stalling the engine.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: EngineEvent) {
        // No subscribers is fine
        if self.sender.send(event).is_err() {
            tracing::trace!("Event dropped, no subscribers");
        }
    }
}
