//! Channel-based data source.
//!
//! Receives twin snapshots via a tokio watch channel. Useful when another
//! part of a program already holds the data and wants to push it to the
//! dashboard rather than have it polled.

use tokio::sync::watch;

use super::{DataSource, TwinSnapshot};

/// A data source that receives twin snapshots via a channel.
///
/// # Example
///
/// ```
/// use twinwatch::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("embedded");
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: watch::Receiver<TwinSnapshot>,
    description: String,
    /// Track if we've returned the initial value yet
    initial_returned: bool,
}

impl ChannelSource {
    /// Create a new channel source from the receiving end of a watch channel.
    pub fn new(receiver: watch::Receiver<TwinSnapshot>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            initial_returned: false,
        }
    }

    /// Create a channel pair for sending snapshots to a ChannelSource.
    ///
    /// Returns (sender, source).
    pub fn create(source_description: &str) -> (watch::Sender<TwinSnapshot>, Self) {
        let (tx, rx) = watch::channel(TwinSnapshot::default());
        (tx, Self::new(rx, source_description))
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self) -> Option<TwinSnapshot> {
        if !self.initial_returned {
            self.initial_returned = true;
            self.receiver.mark_changed();
        }

        if self.receiver.has_changed().unwrap_or(false) {
            Some(self.receiver.borrow_and_update().clone())
        } else {
            None
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        if self.receiver.has_changed().is_err() {
            Some("Channel closed".to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SensorRow;

    #[test]
    fn test_channel_source_poll() {
        let (tx, mut source) = ChannelSource::create("test");

        // Initially returns the default (empty) snapshot
        let snapshot = source.poll().unwrap();
        assert!(snapshot.is_empty());

        assert!(source.poll().is_none());

        tx.send(TwinSnapshot::sensors(vec![SensorRow {
            id: "s1".into(),
            asset_id: "e1".into(),
            asset_type: "edge".into(),
            kind: "flow".into(),
            value: Some(95.0),
            unit: "L/s".into(),
            last_seen: None,
            created_at: None,
        }]))
        .unwrap();

        let snapshot = source.poll().unwrap();
        assert_eq!(snapshot.sensors.unwrap().len(), 1);
        assert!(source.error().is_none());
    }

    #[test]
    fn test_channel_source_reports_closed_sender() {
        let (tx, source) = ChannelSource::create("test");
        drop(tx);
        assert_eq!(source.error().as_deref(), Some("Channel closed"));
        assert_eq!(source.description(), "channel: test");
    }
}
