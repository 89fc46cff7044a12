//! Alert list: unhealthy readings and troubled pipes, worst first.

use std::collections::BTreeSet;

use super::network::{edge_health, NetworkData};
use super::sensors::{AssetKind, AssetSensors, HealthStatus, SensorKey};

/// Why an entry is on the alert list.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertKind {
    /// A reading outside its normal band or past its alert threshold.
    Reading {
        key: SensorKey,
        value: f64,
        unit: String,
    },
    /// A pipe that has been isolated.
    Isolated,
    /// A pipe with open or acknowledged incidents.
    Incident { count: u32, acknowledged: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub status: HealthStatus,
    pub asset_kind: AssetKind,
    pub asset_id: String,
    pub asset_name: String,
    pub kind: AlertKind,
}

impl Alert {
    /// One-line description for the alert table.
    pub fn summary(&self) -> String {
        match &self.kind {
            AlertKind::Reading { key, value, unit } => {
                format!("{} {:.1} {}", key.kind, value, unit).trim_end().to_string()
            }
            AlertKind::Isolated => "Pipe isolated".to_string(),
            AlertKind::Incident {
                count,
                acknowledged,
            } => {
                let plural = if *count == 1 { "" } else { "s" };
                if *acknowledged {
                    format!("{} incident{} (acknowledged)", count, plural)
                } else {
                    format!("{} open incident{}", count, plural)
                }
            }
        }
    }
}

/// Build the alert list, critical first, then by asset name.
pub fn collect_alerts(
    groups: &[AssetSensors],
    network: Option<&NetworkData>,
    isolated: &BTreeSet<String>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for group in groups {
        for reading in &group.sensors {
            if reading.status == HealthStatus::Healthy {
                continue;
            }
            let Some(value) = reading.value else {
                continue;
            };
            alerts.push(Alert {
                status: reading.status,
                asset_kind: group.asset_kind,
                asset_id: group.asset_id.clone(),
                asset_name: group.name.clone(),
                kind: AlertKind::Reading {
                    key: reading.key.clone(),
                    value,
                    unit: reading.unit.clone(),
                },
            });
        }
    }

    if let Some(network) = network {
        for edge in &network.edges {
            let kind = if edge.status == "isolated" || isolated.contains(&edge.id) {
                AlertKind::Isolated
            } else if edge.has_open_incidents || edge.has_acknowledged_incidents {
                AlertKind::Incident {
                    count: edge.active_incident_count.unwrap_or(1).max(1),
                    acknowledged: !edge.has_open_incidents,
                }
            } else {
                continue;
            };
            alerts.push(Alert {
                status: edge_health(edge, isolated),
                asset_kind: AssetKind::Pipe,
                asset_id: edge.id.clone(),
                asset_name: edge.name.clone(),
                kind,
            });
        }
    }

    alerts.sort_by(|a, b| {
        b.status
            .cmp(&a.status)
            .then_with(|| a.asset_name.cmp(&b.asset_name))
    });
    alerts
}
