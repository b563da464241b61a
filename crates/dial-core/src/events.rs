//! Observer-hook re-expression of the original's GObject signals
//! (`invalid-uri`, `gmainloop-quit`, `rest-enable`; spec.md §6, §9).
//!
//! The original emits these as glib signals on the `GDialRestServer` object so an
//! embedding process can react without the core depending on it. Here that becomes a
//! `tokio::sync::broadcast` channel of a small closed enum: any number of subscribers
//! (tests, a surrounding process) can listen without the core crate knowing who, if
//! anyone, is watching.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// One of the three signals the original core emits outward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialEvent {
    /// A request referenced an app name that is not in the registry.
    InvalidUri { message: String },
    /// Test-harness-only: request to stop the surrounding process's main loop.
    GMainLoopQuit { message: String },
    /// Toggle for the public HTTP handler (test-harness-only surface).
    RestEnable { enabled: bool },
}

/// Broadcaster for `DialEvent`s. Cheap to clone; every clone shares the same channel.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DialEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DialEvent> {
        self.sender.subscribe()
    }

    /// Emits `invalid-uri` and logs it the way the original's `g_signal_emit` call site
    /// is paired with a `g_printerr`.
    pub fn invalid_uri(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(message = %message, "invalid-uri");
        let _ = self.sender.send(DialEvent::InvalidUri { message });
    }

    pub fn gmainloop_quit(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(message = %message, "gmainloop-quit");
        let _ = self.sender.send(DialEvent::GMainLoopQuit { message });
    }

    pub fn rest_enable(&self, enabled: bool) {
        tracing::info!(enabled, "rest-enable");
        let _ = self.sender.send(DialEvent::RestEnable { enabled });
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_uri_reaches_subscriber() {
        let bus = EventBroadcaster::default();
        let mut rx = bus.subscribe();
        bus.invalid_uri("URI contains unregistered app name");
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            DialEvent::InvalidUri {
                message: "URI contains unregistered app name".into()
            }
        );
    }

    #[tokio::test]
    async fn rest_enable_toggle() {
        let bus = EventBroadcaster::default();
        let mut rx = bus.subscribe();
        bus.rest_enable(false);
        assert_eq!(rx.recv().await.unwrap(), DialEvent::RestEnable { enabled: false });
    }
}
