// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # twinwatch
//!
//! A terminal dashboard and library for a water-distribution network
//! digital twin.
//!
//! The backend owns the network: topology, sensor ingestion, incident
//! detection and isolation. This crate is the presentation layer. It polls
//! topology and sensor readings, listens to a change feed for pipe
//! isolations, classifies readings against thresholds and draws the network
//! in an interactive terminal UI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│ │
//! │  │ (state) │    │(processing)   │(rendering)   │         │ │
//! │  └────┬────┘    └──────────┘    └─────────┘    └─────────┘ │
//! │       │                                                     │
//! │       ├──▶ source   ◀── HttpSource | FileSource | DemoSource │
//! │       ├──▶ realtime ◀── change feed (TCP, demo)              │
//! │       └──▶ api      ──▶ refresh / simulate leak / reset      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, view navigation, and user interaction logic
//! - **[`source`]**: Data source abstraction ([`DataSource`] trait) with
//!   implementations for the backend API, snapshot files, an in-process demo
//!   network, and channels
//! - **[`realtime`]**: Change-feed [`Subscription`] and isolation tracking
//! - **[`api`]**: HTTP client and the [`ActionSink`] actions are sent through
//! - **[`data`]**: Sensor grouping and thresholds, map layers and colouring,
//!   animated readings, history for sparklines
//! - **[`ui`]**: Terminal rendering using ratatui
//! - **[`settings`]**: Layered configuration (file, environment)
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Live backend, with the change feed
//! twinwatch --api http://localhost:8000 --realtime localhost:9090
//!
//! # Replay a snapshot file
//! twinwatch --file twin.json
//!
//! # No backend at all
//! twinwatch --demo
//! ```
//!
//! ### As a library with file source
//!
//! ```
//! use twinwatch::{App, AppOptions, FileSource, NoActions};
//!
//! let source = Box::new(FileSource::new("twin.json"));
//! let app = App::new(source, Box::new(NoActions::default()), AppOptions::default());
//! ```
//!
//! ### As a library with the demo network
//!
//! ```
//! use std::time::Duration;
//! use twinwatch::{App, AppOptions, DemoActions, DemoNetwork, DemoSource};
//!
//! let network = DemoNetwork::seeded(7).shared();
//! let feed = network.lock().unwrap().subscribe();
//! let source = DemoSource::new(network.clone(), Duration::from_secs(2));
//! let mut app = App::new(
//!     Box::new(source),
//!     Box::new(DemoActions::new(network)),
//!     AppOptions::default(),
//! )
//! .with_realtime(feed);
//!
//! app.reload_data().unwrap();
//! assert_eq!(app.network.as_ref().unwrap().edges.len(), 6);
//! ```
//!
//! ### As a library with channel source
//!
//! ```
//! use twinwatch::{App, AppOptions, ChannelSource, NoActions, TwinSnapshot};
//!
//! let (tx, source) = ChannelSource::create("replay");
//! let app = App::new(Box::new(source), Box::new(NoActions::default()), AppOptions::default());
//! tx.send(TwinSnapshot::sensors(Vec::new())).unwrap();
//! ```
//!
//! ### Listening to a change feed
//!
//! ```no_run
//! use twinwatch::realtime::{subscribe_tcp, IsolationWatch};
//!
//! # tokio_test::block_on(async {
//! let mut feed = subscribe_tcp("localhost:9090").await.unwrap();
//! let mut watch = IsolationWatch::new();
//! while let Some(change) = feed.poll() {
//!     if let Some(notice) = watch.observe(&change) {
//!         println!("{}", notice.title());
//!     }
//! }
//! # });
//! ```

pub mod api;
pub mod app;
pub mod data;
pub mod events;
pub mod logging;
pub mod realtime;
pub mod settings;
pub mod source;
pub mod toast;
pub mod ui;

// Re-export main types for convenience
pub use api::{Action, ActionOutcome, ActionSink, ApiClient, ApiError, HttpActions, NoActions};
pub use app::{App, AppOptions, View};
pub use data::{
    AnimatedValue, AnimationTiming, AssetSensors, HealthStatus, NetworkData, SensorReading,
    Thresholds, ViewMode,
};
pub use realtime::{EdgeChange, IsolationWatch, Subscription};
pub use settings::Settings;
pub use source::{
    ChannelSource, DataSource, DemoActions, DemoNetwork, DemoSource, EdgeRecord, FileSource,
    HttpSource, NodeRecord, SensorRow, Topology, TwinSnapshot,
};
