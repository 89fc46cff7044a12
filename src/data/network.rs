//! Network topology model and map colouring rules.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Instant;

use chrono::{Datelike, NaiveDate};

use super::sensors::HealthStatus;
use crate::source::{EdgeRecord, IncidentSummary, NodeRecord, Topology};

/// A colour as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swatch(pub u32);

impl Swatch {
    pub fn rgb(&self) -> (u8, u8, u8) {
        ((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:06x}", self.0)
    }
}

impl fmt::Display for Swatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

pub mod palette {
    use super::Swatch;

    pub const RED: Swatch = Swatch(0xef4444);
    pub const DARK_RED: Swatch = Swatch(0xdc2626);
    pub const ORANGE: Swatch = Swatch(0xea580c);
    pub const OCHRE: Swatch = Swatch(0xca8a04);
    pub const OLIVE: Swatch = Swatch(0x65a30d);
    pub const GREY: Swatch = Swatch(0x6b7280);
    pub const LIGHT_GREY: Swatch = Swatch(0x9ca3af);
    pub const SKY: Swatch = Swatch(0x0ea5e9);
    pub const GREEN: Swatch = Swatch(0x22c55e);
    pub const AMBER: Swatch = Swatch(0xf59e0b);
    pub const YELLOW: Swatch = Swatch(0xeab308);
}

/// How pipes are coloured on the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ViewMode {
    #[default]
    Status,
    Material,
    Age,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            ViewMode::Status => ViewMode::Material,
            ViewMode::Material => ViewMode::Age,
            ViewMode::Age => ViewMode::Status,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Status => "Status",
            ViewMode::Material => "Material",
            ViewMode::Age => "Age",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" => Some(ViewMode::Status),
            "material" => Some(ViewMode::Material),
            "age" => Some(ViewMode::Age),
            _ => None,
        }
    }

    /// Legend entries for this mode.
    pub fn legend(self) -> &'static [(&'static str, Swatch)] {
        use palette::*;
        match self {
            ViewMode::Status => &[
                ("Normal", SKY),
                ("Incident", DARK_RED),
                ("High", ORANGE),
                ("Medium", OCHRE),
                ("Low", OLIVE),
                ("Isolated", RED),
                ("Closed", GREY),
            ],
            ViewMode::Material => &[
                ("Iron", RED),
                ("PVC", SKY),
                ("PE", GREEN),
                ("Copper", AMBER),
                ("Other", LIGHT_GREY),
            ],
            ViewMode::Age => &[
                ("Before 1990", RED),
                ("1990-2009", YELLOW),
                ("2010+", GREEN),
                ("Unknown", LIGHT_GREY),
            ],
        }
    }
}

/// Year a pipe was installed, if the date parses.
pub fn installation_year(edge: &EdgeRecord) -> Option<i32> {
    let date = edge.installation_date.as_deref()?.trim();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.year())
        .ok()
        .or_else(|| date.get(..4)?.parse().ok())
}

fn is_isolated(edge: &EdgeRecord, isolated: &BTreeSet<String>) -> bool {
    edge.status == "isolated" || isolated.contains(&edge.id)
}

/// Map colour of a pipe.
pub fn edge_color(edge: &EdgeRecord, mode: ViewMode, isolated: &BTreeSet<String>) -> Swatch {
    use palette::*;

    if is_isolated(edge, isolated) {
        return RED;
    }
    if edge.status == "closed" {
        return GREY;
    }

    match mode {
        ViewMode::Material => {
            match edge.material.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("iron") => RED,
                Some("pvc") => SKY,
                Some("pe") => GREEN,
                Some("copper") => AMBER,
                _ => LIGHT_GREY,
            }
        }
        ViewMode::Age => match installation_year(edge) {
            Some(year) if year < 1990 => RED,
            Some(year) if year < 2010 => YELLOW,
            Some(_) => GREEN,
            None => LIGHT_GREY,
        },
        ViewMode::Status => {
            if edge.has_open_incidents || edge.has_acknowledged_incidents {
                return DARK_RED;
            }
            if edge.active_incident_count == Some(0) {
                return SKY;
            }
            match edge.status.as_str() {
                "critical" => DARK_RED,
                "high" => ORANGE,
                "medium" => OCHRE,
                "low" => OLIVE,
                _ => SKY,
            }
        }
    }
}

/// Whether a pipe is drawn dashed.
pub fn is_dashed(edge: &EdgeRecord, isolated: &BTreeSet<String>) -> bool {
    is_isolated(edge, isolated) || edge.has_acknowledged_incidents
}

/// Map colour of a node marker.
pub fn node_color(node: &NodeRecord) -> Swatch {
    match node.kind.as_str() {
        "tank" => palette::GREEN,
        "reservoir" => palette::SKY,
        _ => palette::AMBER,
    }
}

/// Health of a pipe for tables and alerts.
pub fn edge_health(edge: &EdgeRecord, isolated: &BTreeSet<String>) -> HealthStatus {
    if is_isolated(edge, isolated)
        || edge.has_open_incidents
        || matches!(edge.status.as_str(), "critical" | "high")
    {
        HealthStatus::Critical
    } else if edge.has_acknowledged_incidents
        || edge.active_incident_count.unwrap_or(0) > 0
        || matches!(edge.status.as_str(), "medium" | "low" | "closed")
    {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

/// Counts for the stats panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub nodes: usize,
    pub pipes: usize,
    pub active_incidents: u32,
    pub pipes_affected: u32,
}

/// Topology ready for display.
#[derive(Debug, Clone)]
pub struct NetworkData {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub incident_summary: Option<IncidentSummary>,
    positions: HashMap<String, (f64, f64)>,
    /// Bumped on every topology update.
    pub revision: u64,
    pub last_updated: Instant,
}

impl NetworkData {
    pub fn from_topology(topology: Topology, revision: u64) -> Self {
        let positions = topology
            .nodes
            .iter()
            .filter(|n| n.x.is_finite() && n.y.is_finite())
            .map(|n| (n.id.clone(), (n.x, n.y)))
            .collect();
        Self {
            nodes: topology.nodes,
            edges: topology.edges,
            incident_summary: topology.incident_summary,
            positions,
            revision,
            last_updated: Instant::now(),
        }
    }

    /// `(latitude, longitude)` of a node.
    pub fn node_position(&self, id: &str) -> Option<(f64, f64)> {
        self.positions.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeRecord> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Apply a status pushed by the change feed ahead of the next poll.
    ///
    /// Bumps the revision so derived layers rebuild.
    pub fn set_edge_status(&mut self, id: &str, status: &str) -> bool {
        let Some(edge) = self.edges.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if edge.status == status {
            return false;
        }
        edge.status = status.to_string();
        self.revision += 1;
        true
    }

    /// Every pipe id with whether the topology reports it isolated.
    pub fn isolation_states(&self) -> impl Iterator<Item = (&str, bool)> {
        self.edges
            .iter()
            .map(|e| (e.id.as_str(), e.status == "isolated"))
    }

    pub fn stats(&self) -> NetworkStats {
        let (active_incidents, pipes_affected) = match self.incident_summary {
            Some(summary) => (
                summary.total_active_incidents,
                summary.edges_with_active_incidents,
            ),
            None => {
                let counts = self
                    .edges
                    .iter()
                    .map(|e| e.active_incident_count.unwrap_or(0))
                    .filter(|&c| c > 0);
                counts.fold((0, 0), |(total, pipes), c| (total + c, pipes + 1))
            }
        };
        NetworkStats {
            nodes: self.nodes.len(),
            pipes: self.edges.len(),
            active_incidents,
            pipes_affected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(status: &str) -> EdgeRecord {
        EdgeRecord {
            id: "e1".into(),
            name: "P1".into(),
            status: status.into(),
            from_node_id: "a".into(),
            to_node_id: "b".into(),
            active_incident_count: None,
            has_open_incidents: false,
            has_acknowledged_incidents: false,
            material: None,
            installation_date: None,
        }
    }

    fn none() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_isolated_and_closed_override_mode() {
        for mode in [ViewMode::Status, ViewMode::Material, ViewMode::Age] {
            assert_eq!(edge_color(&edge("isolated"), mode, &none()).hex(), "#ef4444");
            assert_eq!(edge_color(&edge("closed"), mode, &none()).hex(), "#6b7280");
        }

        let mut set = none();
        set.insert("e1".to_string());
        let mut e = edge("normal");
        e.material = Some("pvc".into());
        assert_eq!(edge_color(&e, ViewMode::Material, &set), palette::RED);
        assert!(is_dashed(&e, &set));
        assert!(!is_dashed(&e, &none()));
    }

    #[test]
    fn test_material_colors() {
        let cases = [
            ("iron", "#ef4444"),
            ("PVC", "#0ea5e9"),
            ("pe", "#22c55e"),
            ("copper", "#f59e0b"),
            ("steel", "#9ca3af"),
        ];
        for (material, hex) in cases {
            let mut e = edge("normal");
            e.material = Some(material.into());
            assert_eq!(edge_color(&e, ViewMode::Material, &none()).hex(), hex, "{}", material);
        }
        assert_eq!(edge_color(&edge("normal"), ViewMode::Material, &none()), palette::LIGHT_GREY);
    }

    #[test]
    fn test_age_colors() {
        let mut e = edge("normal");
        e.installation_date = Some("1989-12-31".into());
        assert_eq!(edge_color(&e, ViewMode::Age, &none()).hex(), "#ef4444");
        e.installation_date = Some("1990-01-01".into());
        assert_eq!(edge_color(&e, ViewMode::Age, &none()).hex(), "#eab308");
        e.installation_date = Some("2010-06-15".into());
        assert_eq!(edge_color(&e, ViewMode::Age, &none()).hex(), "#22c55e");
        e.installation_date = Some("unknown".into());
        assert_eq!(edge_color(&e, ViewMode::Age, &none()).hex(), "#9ca3af");
        e.installation_date = None;
        assert_eq!(edge_color(&e, ViewMode::Age, &none()).hex(), "#9ca3af");
    }

    #[test]
    fn test_status_colors() {
        let mut e = edge("low");
        assert_eq!(edge_color(&e, ViewMode::Status, &none()).hex(), "#65a30d");
        e.status = "high".into();
        assert_eq!(edge_color(&e, ViewMode::Status, &none()).hex(), "#ea580c");
        e.status = "medium".into();
        assert_eq!(edge_color(&e, ViewMode::Status, &none()).hex(), "#ca8a04");
        e.status = "critical".into();
        assert_eq!(edge_color(&e, ViewMode::Status, &none()).hex(), "#dc2626");

        // A zero incident count wins over the status severity
        e.active_incident_count = Some(0);
        assert_eq!(edge_color(&e, ViewMode::Status, &none()).hex(), "#0ea5e9");

        e.has_acknowledged_incidents = true;
        assert_eq!(edge_color(&e, ViewMode::Status, &none()).hex(), "#dc2626");
        assert!(is_dashed(&e, &none()));

        assert_eq!(edge_color(&edge("normal"), ViewMode::Status, &none()).hex(), "#0ea5e9");
    }

    #[test]
    fn test_node_colors() {
        let mut node = NodeRecord {
            id: "n".into(),
            name: "N".into(),
            kind: "tank".into(),
            x: 0.0,
            y: 0.0,
            pressure: None,
        };
        assert_eq!(node_color(&node).hex(), "#22c55e");
        node.kind = "reservoir".into();
        assert_eq!(node_color(&node).hex(), "#0ea5e9");
        node.kind = "junction".into();
        assert_eq!(node_color(&node).hex(), "#f59e0b");
    }

    #[test]
    fn test_view_mode_cycles() {
        assert_eq!(ViewMode::Status.next(), ViewMode::Material);
        assert_eq!(ViewMode::Material.next(), ViewMode::Age);
        assert_eq!(ViewMode::Age.next(), ViewMode::Status);
        assert_eq!(ViewMode::parse("AGE"), Some(ViewMode::Age));
        assert_eq!(ViewMode::parse("colour"), None);
    }

    #[test]
    fn test_stats_fall_back_to_edge_counts() {
        let mut a = edge("critical");
        a.active_incident_count = Some(2);
        let mut b = edge("normal");
        b.id = "e2".into();
        b.active_incident_count = Some(0);
        let network = NetworkData::from_topology(
            Topology {
                nodes: Vec::new(),
                edges: vec![a, b],
                incident_summary: None,
            },
            1,
        );
        let stats = network.stats();
        assert_eq!(stats.pipes, 2);
        assert_eq!(stats.active_incidents, 2);
        assert_eq!(stats.pipes_affected, 1);
    }

    #[test]
    fn test_set_edge_status_bumps_revision() {
        let mut network = NetworkData::from_topology(
            Topology {
                nodes: Vec::new(),
                edges: vec![edge("normal")],
                incident_summary: None,
            },
            7,
        );
        assert!(network.set_edge_status("e1", "isolated"));
        assert_eq!(network.revision, 8);
        assert!(!network.set_edge_status("e1", "isolated"));
        assert!(!network.set_edge_status("missing", "isolated"));
        assert_eq!(
            network.isolation_states().collect::<Vec<_>>(),
            vec![("e1", true)]
        );
    }

    #[test]
    fn test_edge_health() {
        assert_eq!(edge_health(&edge("normal"), &none()), HealthStatus::Healthy);
        assert_eq!(edge_health(&edge("medium"), &none()), HealthStatus::Warning);
        assert_eq!(edge_health(&edge("isolated"), &none()), HealthStatus::Critical);
    }
}
