//! Data models and processing for twin snapshots.
//!
//! This module turns raw topology and sensor rows into display-ready
//! structures and holds the time-driven display state.
//!
//! ## Submodules
//!
//! - [`alerts`]: Alert list built from readings and pipe status
//! - [`animated`]: The animated reading state machine ([`AnimatedValue`])
//! - [`basemap`]: Process-wide reference street map
//! - [`board`]: One animated display per sensor card
//! - [`duration`]: Parsing and formatting of durations (e.g., "5s", "2000ms")
//! - [`history`]: Per-sensor history for sparklines
//! - [`map`]: Marker and polyline layers
//! - [`network`]: Topology model and colour rules
//! - [`sensors`]: Grouping and threshold classification
//! - [`timer`]: Cancellable one-shot timers
//!
//! ## Data Flow
//!
//! ```text
//! TwinSnapshot (raw JSON)
//!        │
//!        ├──▶ NetworkData::from_topology() ──▶ MapLayers::sync()
//!        │
//!        └──▶ group_sensors() ──┬──▶ AnimationBoard::sync()
//!                               ├──▶ History::record()
//!                               └──▶ collect_alerts()
//! ```

pub mod alerts;
pub mod animated;
pub mod basemap;
pub mod board;
pub mod duration;
pub mod history;
pub mod map;
pub mod network;
pub mod sensors;
pub mod timer;

pub use alerts::{collect_alerts, Alert, AlertKind};
pub use animated::{format_reading, AnimatedValue, AnimationTiming, Direction, Phase};
pub use basemap::Basemap;
pub use board::AnimationBoard;
pub use history::History;
pub use map::{Bounds, MapLayers, Marker, Polyline};
pub use network::{NetworkData, NetworkStats, Swatch, ViewMode};
pub use sensors::{
    group_sensors, AssetKind, AssetSensors, HealthStatus, SensorKey, SensorKind, SensorReading,
    Thresholds,
};
pub use timer::Timer;
