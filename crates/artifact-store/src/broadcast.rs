//! In-process change notifications.
//!
//! Every committed write, and every external edit the watcher detects,
//! produces a [`StoreEvent::FileChanged`] followed by a
//! [`StoreEvent::ArtifactUpdated`]. Forwarding these to remote clients is the
//! job of whatever holds a [`Subscription`].

use crate::types::{Actor, Modality};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreEvent {
    FileChanged {
        path: String,
        actor: Actor,
    },
    ArtifactUpdated {
        modality: Modality,
        artifact: String,
        actor: Actor,
    },
}

impl StoreEvent {
    pub fn path(&self) -> &str {
        match self {
            StoreEvent::FileChanged { path, .. } => path,
            StoreEvent::ArtifactUpdated { artifact, .. } => artifact,
        }
    }

    pub fn actor(&self) -> Actor {
        match self {
            StoreEvent::FileChanged { actor, .. } | StoreEvent::ArtifactUpdated { actor, .. } => {
                *actor
            }
        }
    }
}

pub type Subscription = broadcast::Receiver<StoreEvent>;

#[derive(Debug, Clone)]
pub struct ChangeBroadcaster {
    tx: broadcast::Sender<StoreEvent>,
}

impl ChangeBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Dispatches both event kinds for `artifact`. Never blocks; with no
    /// subscribers the events are dropped.
    pub fn emit(&self, artifact: &str, actor: Actor) {
        let _ = self.tx.send(StoreEvent::FileChanged {
            path: artifact.to_string(),
            actor,
        });
        let _ = self.tx.send(StoreEvent::ArtifactUpdated {
            modality: Modality::from_path(artifact),
            artifact: artifact.to_string(),
            actor,
        });
        tracing::debug!(artifact, %actor, "change broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_sends_both_events_in_order() {
        let broadcaster = ChangeBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.emit("slides/q3.slides.md", Actor::User);

        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::FileChanged {
                path: "slides/q3.slides.md".to_string(),
                actor: Actor::User,
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::ArtifactUpdated {
                modality: Modality::Presentation,
                artifact: "slides/q3.slides.md".to_string(),
                actor: Actor::User,
            }
        );
    }

    #[test]
    fn test_emit_without_subscribers() {
        let broadcaster = ChangeBroadcaster::new(1);
        assert_eq!(broadcaster.subscriber_count(), 0);
        broadcaster.emit("a.md", Actor::Agent);
    }

    #[test]
    fn test_event_wire_format() {
        let event = StoreEvent::ArtifactUpdated {
            modality: Modality::Whiteboard,
            artifact: "b.excalidraw".to_string(),
            actor: Actor::Agent,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ARTIFACT_UPDATED");
        assert_eq!(json["modality"], "whiteboard");
        assert_eq!(json["actor"], "agent");
        assert_eq!(event.path(), "b.excalidraw");
        assert_eq!(event.actor(), Actor::Agent);
    }
}
