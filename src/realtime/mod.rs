//! Realtime change feed.
//!
//! A [`Subscription`] delivers [`EdgeChange`] events pushed by the backend
//! (or by the demo network). Dropping or unsubscribing stops delivery; no
//! event is observed after that.

mod event;
mod feed;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use event::{EdgeChange, EdgeRow};
pub use feed::{subscribe_stream, subscribe_tcp};

/// Handle to an active change-feed subscription.
#[derive(Debug)]
pub struct Subscription {
    receiver: Option<mpsc::UnboundedReceiver<EdgeChange>>,
    task: Option<JoinHandle<()>>,
    description: String,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<EdgeChange>,
        description: &str,
        task: Option<JoinHandle<()>>,
        last_error: Arc<Mutex<Option<String>>>,
    ) -> Self {
        Self {
            receiver: Some(receiver),
            task,
            description: description.to_string(),
            last_error,
        }
    }

    /// Subscription fed directly by an in-process sender.
    pub fn from_channel(receiver: mpsc::UnboundedReceiver<EdgeChange>, description: &str) -> Self {
        Self::new(receiver, description, None, Arc::new(Mutex::new(None)))
    }

    /// Next pending event, if any. Never blocks.
    pub fn poll(&mut self) -> Option<EdgeChange> {
        self.receiver.as_mut()?.try_recv().ok()
    }

    /// Stop delivery. Pending events are discarded. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
        }
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Last feed error, e.g. a closed connection or an unparseable event.
    pub fn error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|e| e.clone())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// A pipe newly seen as isolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationNotice {
    pub edge_id: String,
    pub edge_name: String,
}

impl IsolationNotice {
    pub fn title(&self) -> String {
        format!("Pipe {} has been isolated", self.edge_name)
    }

    pub fn description(&self) -> &'static str {
        "Autonomous isolation action triggered by AI agent"
    }
}

/// Tracks which pipes have been reported isolated.
///
/// An edge produces at most one notice per transition into isolation; a
/// later non-isolated update for the same edge re-arms it.
#[derive(Debug, Default)]
pub struct IsolationWatch {
    isolated: BTreeSet<String>,
}

impl IsolationWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one change into the isolated set.
    pub fn observe(&mut self, change: &EdgeChange) -> Option<IsolationNotice> {
        if !change.is_edge_update() {
            return None;
        }
        let row = change.new_row.as_ref()?;
        if row.status != "isolated" {
            self.isolated.remove(&row.id);
            return None;
        }
        if !self.isolated.insert(row.id.clone()) {
            return None;
        }
        let edge_name = if row.name.is_empty() {
            row.id.clone()
        } else {
            row.name.clone()
        };
        Some(IsolationNotice {
            edge_id: row.id.clone(),
            edge_name,
        })
    }

    /// Reconcile with a fresh topology without raising notices.
    ///
    /// The topology decides for every edge it lists, in both directions.
    /// Edges it does not list keep whatever the change feed reported.
    pub fn sync_topology<'a>(&mut self, edges: impl IntoIterator<Item = (&'a str, bool)>) {
        for (id, isolated) in edges {
            if isolated {
                self.isolated.insert(id.to_string());
            } else {
                self.isolated.remove(id);
            }
        }
    }

    pub fn is_isolated(&self, edge_id: &str) -> bool {
        self.isolated.contains(edge_id)
    }

    pub fn isolated(&self) -> &BTreeSet<String> {
        &self.isolated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, status: &str) -> EdgeRow {
        EdgeRow {
            id: id.into(),
            name: format!("Pipe-{}", id),
            status: status.into(),
        }
    }

    #[test]
    fn test_subscription_delivers_until_unsubscribed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = Subscription::from_channel(rx, "demo");
        tx.send(EdgeChange::update(row("e1", "isolated"), None)).unwrap();
        assert!(sub.poll().is_some());
        assert!(sub.poll().is_none());

        tx.send(EdgeChange::update(row("e2", "isolated"), None)).unwrap();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert!(sub.poll().is_none());
        assert!(tx.send(EdgeChange::default()).is_err());

        // Second call is harmless
        sub.unsubscribe();
    }

    #[test]
    fn test_drop_closes_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = Subscription::from_channel(rx, "demo");
        drop(sub);
        assert!(tx.is_closed());
    }

    #[test]
    fn test_isolation_notice_once_per_transition() {
        let mut watch = IsolationWatch::new();
        let isolate = EdgeChange::update(row("e1", "isolated"), None);

        let notice = watch.observe(&isolate).unwrap();
        assert_eq!(notice.title(), "Pipe Pipe-e1 has been isolated");
        assert_eq!(
            notice.description(),
            "Autonomous isolation action triggered by AI agent"
        );
        assert!(watch.observe(&isolate).is_none());
        assert!(watch.is_isolated("e1"));

        watch.observe(&EdgeChange::update(row("e1", "normal"), None));
        assert!(!watch.is_isolated("e1"));
        assert!(watch.observe(&isolate).is_some());
    }

    #[test]
    fn test_topology_isolated_edges_do_not_notify() {
        let mut watch = IsolationWatch::new();
        watch.sync_topology([("e9", true)]);
        assert!(watch.observe(&EdgeChange::update(row("e9", "isolated"), None)).is_none());
    }

    #[test]
    fn test_topology_clears_restored_edges() {
        let mut watch = IsolationWatch::new();
        watch.sync_topology([("e1", true), ("e2", false)]);
        watch.observe(&EdgeChange::update(row("e3", "isolated"), None));
        assert!(watch.is_isolated("e1"));

        watch.sync_topology([("e1", false), ("e2", false)]);
        assert!(!watch.is_isolated("e1"));
        // Not listed by the topology, so the feed's report stands
        assert!(watch.is_isolated("e3"));

        // Re-armed: a later isolation notifies again
        assert!(watch
            .observe(&EdgeChange::update(row("e1", "isolated"), None))
            .is_some());
    }

    #[test]
    fn test_unnamed_edge_uses_id() {
        let mut watch = IsolationWatch::new();
        let change = EdgeChange::update(
            EdgeRow {
                id: "e5".into(),
                name: String::new(),
                status: "isolated".into(),
            },
            None,
        );
        assert_eq!(watch.observe(&change).unwrap().edge_name, "e5");
    }
}
