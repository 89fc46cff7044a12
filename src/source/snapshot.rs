//! Wire records shared by every data source.
//!
//! These types match the JSON served by the network twin backend
//! (`/network/topology`, `/sensors`) and the offline snapshot file format.
//! Optional fields default when absent and unknown fields are ignored, so
//! older or richer backends both deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A network asset (tank, reservoir, junction) with a map position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Asset kind, e.g. "tank", "reservoir", "junction".
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Latitude.
    pub x: f64,
    /// Longitude.
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

/// A pipe segment connecting two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Operational status, e.g. "normal", "isolated", "closed", "critical".
    #[serde(default)]
    pub status: String,
    pub from_node_id: String,
    pub to_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_incident_count: Option<u32>,
    #[serde(default)]
    pub has_open_incidents: bool,
    #[serde(default)]
    pub has_acknowledged_incidents: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Installation date as "YYYY-MM-DD".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_date: Option<String>,
}

/// Counts of open incidents across the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSummary {
    #[serde(default)]
    pub total_active_incidents: u32,
    #[serde(default)]
    pub edges_with_active_incidents: u32,
}

/// Response of the topology endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_summary: Option<IncidentSummary>,
}

/// One flat sensor reading as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRow {
    #[serde(default)]
    pub id: String,
    pub asset_id: String,
    /// Either "edge" or "node".
    #[serde(default)]
    pub asset_type: String,
    /// Reading kind, e.g. "pressure", "flow", "acoustic".
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: String,
    /// RFC 3339 timestamp of the reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    /// RFC 3339 timestamp of the row insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl SensorRow {
    /// Timestamp used to order rows newest first.
    ///
    /// Prefers the insert time, falls back to the reading time. Unparseable
    /// timestamps count as missing.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.last_seen.as_deref().and_then(parse_timestamp))
    }

    /// When the sensor last reported.
    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen.as_deref().and_then(parse_timestamp)
    }
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Response of the sensors endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorsResponse {
    #[serde(default)]
    pub sensors: Vec<SensorRow>,
    #[serde(default)]
    pub count: usize,
}

/// An update delivered by a data source.
///
/// Topology and sensors refresh on different intervals, so either half may
/// be missing; a missing half means "unchanged", not "empty".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwinSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<Topology>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Vec<SensorRow>>,
}

impl TwinSnapshot {
    /// A snapshot carrying only a topology.
    pub fn topology(topology: Topology) -> Self {
        Self {
            topology: Some(topology),
            sensors: None,
        }
    }

    /// A snapshot carrying only sensor rows.
    pub fn sensors(sensors: Vec<SensorRow>) -> Self {
        Self {
            topology: None,
            sensors: Some(sensors),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.topology.is_none() && self.sensors.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_topology() {
        let json = r#"{
            "nodes": [
                {"id": "n1", "name": "Tank A", "type": "tank", "x": 37.33, "y": -121.88, "pressure": 62.5},
                {"id": "n2", "name": "J1", "type": "junction", "x": 37.34, "y": -121.87, "pressure": null}
            ],
            "edges": [
                {"id": "e1", "name": "P1", "status": "normal", "from_node_id": "n1", "to_node_id": "n2",
                 "active_incident_count": 0, "material": "PVC", "installation_date": "1985-04-01",
                 "highest_priority_incident": null}
            ],
            "incident_summary": {"total_active_incidents": 2, "edges_with_active_incidents": 1}
        }"#;

        let topology: Topology = serde_json::from_str(json).unwrap();
        assert_eq!(topology.nodes.len(), 2);
        assert_eq!(topology.nodes[0].kind, "tank");
        assert_eq!(topology.nodes[1].pressure, None);

        let edge = &topology.edges[0];
        assert_eq!(edge.active_incident_count, Some(0));
        assert!(!edge.has_open_incidents);
        assert_eq!(edge.material.as_deref(), Some("PVC"));
        assert_eq!(
            topology.incident_summary,
            Some(IncidentSummary {
                total_active_incidents: 2,
                edges_with_active_incidents: 1
            })
        );
    }

    #[test]
    fn test_deserialize_sensors_response() {
        let json = r#"{
            "sensors": [
                {"id": "s1", "asset_id": "e1", "asset_type": "edge", "type": "pressure",
                 "value": 61.2, "unit": "psi", "last_seen": "2026-10-18T10:00:00Z"},
                {"id": "s2", "asset_id": "e1", "asset_type": "edge", "type": "flow",
                 "value": null, "unit": "L/s"}
            ],
            "count": 2
        }"#;

        let response: SensorsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.count, 2);
        assert_eq!(response.sensors[0].kind, "pressure");
        assert_eq!(
            response.sensors[0].recorded_at(),
            parse_timestamp("2026-10-18T10:00:00Z")
        );
        assert_eq!(response.sensors[1].value, None);
        assert_eq!(response.sensors[1].recorded_at(), None);
    }

    #[test]
    fn test_recorded_at_prefers_created_at() {
        let row = SensorRow {
            id: "s1".into(),
            asset_id: "e1".into(),
            asset_type: "edge".into(),
            kind: "flow".into(),
            value: Some(90.0),
            unit: "L/s".into(),
            last_seen: Some("2026-10-18T12:00:00+02:00".into()),
            created_at: Some("garbage".into()),
        };
        // Bad created_at falls back to last_seen, normalised to UTC
        assert_eq!(row.recorded_at(), parse_timestamp("2026-10-18T10:00:00Z"));
    }

    #[test]
    fn test_partial_snapshot() {
        let snapshot: TwinSnapshot = serde_json::from_str(r#"{"sensors": []}"#).unwrap();
        assert!(snapshot.topology.is_none());
        assert_eq!(snapshot.sensors, Some(Vec::new()));
        assert!(!snapshot.is_empty());

        let empty: TwinSnapshot = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
