//! Sensor grouping and threshold classification.
//!
//! Flat sensor rows from the backend are grouped by the asset they are
//! mounted on, reduced to the newest reading per sensor type, and annotated
//! with a health status computed from configurable [`Thresholds`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::network::NetworkData;
use crate::source::SensorRow;

/// Health status for a reading, an asset or a pipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthStatus {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "OK",
            HealthStatus::Warning => "WARN",
            HealthStatus::Critical => "ALERT",
        }
    }
}

/// Inclusive range of values considered normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Alert thresholds and normal bands per reading kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Pressure (psi) below this raises an alert.
    pub pressure_alert_below: f64,
    pub pressure_normal: Band,
    /// Acoustic level (dB) above this raises an alert.
    pub acoustic_alert_above: f64,
    pub acoustic_normal: Band,
    /// Flow (L/s) above this raises an alert.
    pub flow_alert_above: f64,
    pub flow_normal: Band,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pressure_alert_below: 55.0,
            pressure_normal: Band::new(60.0, 70.0),
            acoustic_alert_above: 5.0,
            acoustic_normal: Band::new(2.0, 3.5),
            flow_alert_above: 110.0,
            flow_normal: Band::new(80.0, 100.0),
        }
    }
}

impl Thresholds {
    /// Classify one reading. Missing values and unknown kinds are healthy.
    pub fn classify(&self, kind: &SensorKind, value: Option<f64>) -> HealthStatus {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return HealthStatus::Healthy;
        };
        let (alerting, band) = match kind {
            SensorKind::Pressure => (v < self.pressure_alert_below, self.pressure_normal),
            SensorKind::Acoustic => (v > self.acoustic_alert_above, self.acoustic_normal),
            SensorKind::Flow => (v > self.flow_alert_above, self.flow_normal),
            SensorKind::Other(_) => return HealthStatus::Healthy,
        };
        if alerting {
            HealthStatus::Critical
        } else if !band.contains(v) {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }

    /// Normal band for a kind, if it has one.
    pub fn normal_band(&self, kind: &SensorKind) -> Option<Band> {
        match kind {
            SensorKind::Pressure => Some(self.pressure_normal),
            SensorKind::Acoustic => Some(self.acoustic_normal),
            SensorKind::Flow => Some(self.flow_normal),
            SensorKind::Other(_) => None,
        }
    }
}

/// What a sensor measures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Pressure,
    Flow,
    Acoustic,
    Other(String),
}

impl SensorKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pressure" => SensorKind::Pressure,
            "flow" => SensorKind::Flow,
            "acoustic" => SensorKind::Acoustic,
            other => SensorKind::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SensorKind::Pressure => "pressure",
            SensorKind::Flow => "flow",
            SensorKind::Acoustic => "acoustic",
            SensorKind::Other(name) => name,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SensorKind::Pressure => 0,
            SensorKind::Flow => 1,
            SensorKind::Acoustic => 2,
            SensorKind::Other(_) => 3,
        }
    }
}

impl Ord for SensorKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.label().cmp(other.label()))
    }
}

impl PartialOrd for SensorKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of one sensor: the asset it sits on and what it measures.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorKey {
    pub asset_id: String,
    pub kind: String,
}

impl SensorKey {
    pub fn new(asset_id: &str, kind: &str) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            kind: kind.to_ascii_lowercase(),
        }
    }
}

/// The newest reading of one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub key: SensorKey,
    pub kind: SensorKind,
    pub value: Option<f64>,
    pub unit: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub status: HealthStatus,
}

/// Whether a group belongs to a pipe or to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKind {
    Pipe,
    Node,
    Other,
}

impl AssetKind {
    pub fn parse(asset_type: &str) -> Self {
        match asset_type {
            "edge" => AssetKind::Pipe,
            "node" => AssetKind::Node,
            _ => AssetKind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Pipe => "Pipe",
            AssetKind::Node => "Node",
            AssetKind::Other => "Asset",
        }
    }
}

/// All current readings for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSensors {
    pub asset_id: String,
    pub asset_kind: AssetKind,
    pub name: String,
    pub sensors: Vec<SensorReading>,
}

impl AssetSensors {
    /// Worst status across the asset's readings.
    pub fn health(&self) -> HealthStatus {
        self.sensors
            .iter()
            .map(|s| s.status)
            .max()
            .unwrap_or(HealthStatus::Healthy)
    }

    pub fn alert_count(&self) -> usize {
        self.sensors
            .iter()
            .filter(|s| s.status == HealthStatus::Critical)
            .count()
    }
}

/// Fallback label for an asset with no known name.
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Group rows by asset, keeping the newest reading per sensor type.
///
/// Names come from `network` when available. Groups are ordered pipes
/// first, then nodes, then by name; readings within a group are ordered
/// pressure, flow, acoustic, then the rest alphabetically.
pub fn group_sensors(
    rows: &[SensorRow],
    network: Option<&NetworkData>,
    thresholds: &Thresholds,
) -> Vec<AssetSensors> {
    let mut pipe_names: HashMap<&str, &str> = HashMap::new();
    let mut node_names: HashMap<&str, &str> = HashMap::new();
    if let Some(network) = network {
        for edge in &network.edges {
            pipe_names.insert(edge.id.as_str(), edge.name.as_str());
        }
        for node in &network.nodes {
            node_names.insert(node.id.as_str(), node.name.as_str());
        }
    }

    // Newest first; rows without a timestamp sort last, keeping input order
    let mut ordered: Vec<&SensorRow> = rows.iter().collect();
    ordered.sort_by(|a, b| b.recorded_at().cmp(&a.recorded_at()));

    let mut groups: BTreeMap<(AssetKind, String), BTreeMap<SensorKind, SensorReading>> =
        BTreeMap::new();
    for row in ordered {
        let asset_kind = AssetKind::parse(&row.asset_type);
        let kind = SensorKind::parse(&row.kind);
        let readings = groups
            .entry((asset_kind, row.asset_id.clone()))
            .or_default();
        if readings.contains_key(&kind) {
            continue;
        }
        let status = thresholds.classify(&kind, row.value);
        readings.insert(
            kind.clone(),
            SensorReading {
                key: SensorKey::new(&row.asset_id, kind.label()),
                kind,
                value: row.value.filter(|v| v.is_finite()),
                unit: row.unit.clone(),
                last_seen: row.last_seen_at(),
                status,
            },
        );
    }

    let no_names = HashMap::new();
    let mut result: Vec<AssetSensors> = groups
        .into_iter()
        .map(|((asset_kind, asset_id), readings)| {
            let lookup = match asset_kind {
                AssetKind::Pipe => &pipe_names,
                AssetKind::Node => &node_names,
                AssetKind::Other => &no_names,
            };
            let name = lookup
                .get(asset_id.as_str())
                .filter(|n| !n.is_empty())
                .map(|n| n.to_string())
                .unwrap_or_else(|| short_id(&asset_id));
            AssetSensors {
                asset_id,
                asset_kind,
                name,
                sensors: readings.into_values().collect(),
            }
        })
        .collect();

    result.sort_by(|a, b| {
        a.asset_kind
            .cmp(&b.asset_kind)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.asset_id.cmp(&b.asset_id))
    });
    result
}
