//! Fire-and-forget action dispatch.
//!
//! The render loop must never wait on the network, so actions are spawned
//! onto the tokio runtime and their outcome comes back on a channel that
//! the loop drains once per frame.

use std::fmt::Debug;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{Action, ApiClient};

/// Result of a dispatched action, ready to show as a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: Action,
    /// Backend message on success, error text on failure.
    pub result: Result<Option<String>, String>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Somewhere actions can be sent.
///
/// Implementations must not block in [`ActionSink::dispatch`].
pub trait ActionSink: Send + Debug {
    /// Start an action in the background.
    fn dispatch(&mut self, action: Action);

    /// Take the next finished action, if any. Non-blocking.
    fn poll_outcome(&mut self) -> Option<ActionOutcome>;
}

/// Sends actions to the backend HTTP API.
#[derive(Debug)]
pub struct HttpActions {
    client: ApiClient,
    runtime: Handle,
    tx: mpsc::UnboundedSender<ActionOutcome>,
    rx: mpsc::UnboundedReceiver<ActionOutcome>,
}

impl HttpActions {
    /// Create a dispatcher spawning onto `runtime`.
    pub fn new(client: ApiClient, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            runtime,
            tx,
            rx,
        }
    }
}

impl ActionSink for HttpActions {
    fn dispatch(&mut self, action: Action) {
        let client = self.client.clone();
        let tx = self.tx.clone();

        self.runtime.spawn(async move {
            let result = client.trigger(&action).await;
            match &result {
                Ok(_) => info!(action = %action.label(), "action succeeded"),
                Err(e) => warn!(action = %action.label(), error = %e, "action failed"),
            }
            let outcome = ActionOutcome {
                action,
                result: result.map_err(|e| e.to_string()),
            };
            // Receiver gone means the dashboard is shutting down
            let _ = tx.send(outcome);
        });
    }

    fn poll_outcome(&mut self) -> Option<ActionOutcome> {
        self.rx.try_recv().ok()
    }
}

/// Used when no backend is configured: every action fails immediately.
#[derive(Debug, Default)]
pub struct NoActions {
    pending: Vec<ActionOutcome>,
}

impl ActionSink for NoActions {
    fn dispatch(&mut self, action: Action) {
        self.pending.push(ActionOutcome {
            action,
            result: Err("No backend API configured".to_string()),
        });
    }

    fn poll_outcome(&mut self) -> Option<ActionOutcome> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }
}
