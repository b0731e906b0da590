//! Fire-and-forget notification channel between the session core and
//! whatever UI surface is listening.
//!
//! Emission never blocks and never fails the emitter: when no listener
//! is subscribed the message is simply dropped, which is the contract —
//! toasts are advisory, not state.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// How the UI should render a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Error,
}

/// A user-facing toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

/// Broadcast hub for notifications.
///
/// Cheap to clone; every clone emits into the same stream.
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
}

impl NotificationHub {
    /// Hub with room for `capacity` undelivered notifications per
    /// subscriber before the oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an informational notification.
    pub fn info(&self, title: &str, description: &str) {
        self.notify(title, description, Severity::Info);
    }

    /// Emit an error notification.
    pub fn error(&self, title: &str, description: &str) {
        self.notify(title, description, Severity::Error);
    }

    /// Emit a notification. Dropped silently if nobody listens.
    pub fn notify(&self, title: &str, description: &str, severity: Severity) {
        let _ = self.tx.send(Notification {
            title: title.to_string(),
            description: description.to_string(),
            severity,
        });
    }

    /// Subscribe to notifications emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(64)
    }
}

// ── Tests ────────────────────────────────────────────────────────
