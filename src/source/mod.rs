//! Data source abstraction for receiving twin snapshots.
//!
//! This module provides a trait-based abstraction for receiving topology and
//! sensor data from various places: the backend HTTP API, an offline
//! snapshot file, an in-process demo network, or an in-memory channel.

mod channel;
mod demo;
mod file;
mod http;
mod snapshot;

pub use channel::ChannelSource;
pub use demo::{DemoActions, DemoNetwork, DemoSource};
pub use file::FileSource;
pub use http::{HttpSource, PollIntervals};
pub use snapshot::{
    EdgeRecord, IncidentSummary, NodeRecord, SensorRow, SensorsResponse, Topology, TwinSnapshot,
};

use std::fmt::Debug;

/// Trait for receiving twin data from various sources.
///
/// # Example
///
/// ```
/// use twinwatch::{FileSource, DataSource};
///
/// let mut source = FileSource::new("twin.json");
/// if let Some(snapshot) = source.poll() {
///     println!("Got topology: {}", snapshot.topology.is_some());
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Poll for the latest snapshot.
    ///
    /// Returns `Some(snapshot)` if new data is available, `None` otherwise.
    /// This method must be non-blocking.
    fn poll(&mut self) -> Option<TwinSnapshot>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;

    /// The most recent fetch error, if the source is currently failing.
    fn error(&self) -> Option<String>;

    /// Ask the source to fetch again as soon as it can.
    fn refresh(&mut self) {}
}
