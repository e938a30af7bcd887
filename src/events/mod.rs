//! Board events for view code and outbound notifications.

pub mod notifier;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

pub use notifier::{Notification, Notifier, RecordingNotifier};

/// What the coordinator tells the interface after a move reaches a terminal
/// state. Rejections and rollbacks carry the text to show the user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    IssueCreated {
        issue_id: Uuid,
        status_id: String,
    },
    IssueMoved {
        issue_id: Uuid,
        from_status: String,
        to_status: String,
        transition_id: Uuid,
    },
    MoveRejected {
        issue_id: Uuid,
        code: String,
        message: String,
    },
    MoveRolledBack {
        issue_id: Uuid,
        restored_status: String,
        message: String,
    },
    IssuesSynced {
        count: usize,
    },
}

#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<BoardEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: BoardEvent) {
        if self.tx.send(event).is_err() {
            debug!("Board event dropped: no subscribers");
        }
    }
}
