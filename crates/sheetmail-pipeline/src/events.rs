//! Batch event system for observability.
//!
//! Emits [`BatchEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! observers (progress printers, tests) can follow a batch without coupling
//! to the dispatcher internals.

use serde::{Deserialize, Serialize};

/// Lifecycle of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Events emitted during a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    BatchStarted {
        batch_id: uuid::Uuid,
        rows: usize,
        concurrency: usize,
    },
    BatchFailed {
        batch_id: uuid::Uuid,
        error: String,
    },
    BatchCompleted {
        batch_id: uuid::Uuid,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
    RowStarted {
        row: usize,
    },
    RowValidated {
        row: usize,
        errors: usize,
    },
    AttachmentFailed {
        row: usize,
        column: String,
        error: String,
    },
    RowSent {
        row: usize,
        attachments: usize,
    },
    RowSendFailed {
        row: usize,
        reason: String,
    },
}

impl BatchEvent {
    /// State a batch is in right after this event.
    pub fn state(&self) -> BatchState {
        match self {
            BatchEvent::BatchFailed { .. } => BatchState::Failed,
            BatchEvent::BatchCompleted { .. } => BatchState::Completed,
            _ => BatchState::Running,
        }
    }
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<BatchEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: BatchEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
