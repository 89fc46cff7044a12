//! Map layers: node markers and pipe polylines.
//!
//! Layers are derived data. Whenever any input changes (topology revision,
//! isolated set, view mode) both sets are discarded and rebuilt from
//! scratch rather than patched.

use std::collections::BTreeSet;

use super::network::{edge_color, is_dashed, node_color, NetworkData, Swatch, ViewMode};

/// Default map centre as `(latitude, longitude)`.
pub const DEFAULT_CENTER: (f64, f64) = (37.3365, -121.8815);

/// A node drawn on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub node_id: String,
    pub label: String,
    pub lat: f64,
    pub lon: f64,
    pub color: Swatch,
}

/// A pipe drawn on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub edge_id: String,
    pub label: String,
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub color: Swatch,
    pub dashed: bool,
}

impl Polyline {
    /// Midpoint as `(latitude, longitude)`.
    pub fn midpoint(&self) -> (f64, f64) {
        (
            (self.from.0 + self.to.0) / 2.0,
            (self.from.1 + self.to.1) / 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LayerInputs {
    revision: u64,
    isolated: BTreeSet<String>,
    mode: ViewMode,
}

/// Geographic extent as `(min, max)` latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lat: (f64, f64),
    pub lon: (f64, f64),
}

impl Bounds {
    /// A square box of `half_span` degrees around a point.
    pub fn around(center: (f64, f64), half_span: f64) -> Self {
        Self {
            lat: (center.0 - half_span, center.0 + half_span),
            lon: (center.1 - half_span, center.1 + half_span),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat.0 + self.lat.1) / 2.0,
            (self.lon.0 + self.lon.1) / 2.0,
        )
    }

    /// Shrink (factor < 1) or grow (factor > 1) around the centre.
    pub fn scaled(&self, factor: f64) -> Self {
        let (clat, clon) = self.center();
        let half_lat = (self.lat.1 - self.lat.0) / 2.0 * factor;
        let half_lon = (self.lon.1 - self.lon.0) / 2.0 * factor;
        Self {
            lat: (clat - half_lat, clat + half_lat),
            lon: (clon - half_lon, clon + half_lon),
        }
    }
}

/// Marker and polyline sets currently on the map.
#[derive(Debug, Default)]
pub struct MapLayers {
    markers: Vec<Marker>,
    polylines: Vec<Polyline>,
    inputs: Option<LayerInputs>,
    rebuilds: u64,
}

impl MapLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild both layers if any input changed. Returns whether it did.
    pub fn sync(&mut self, network: &NetworkData, isolated: &BTreeSet<String>, mode: ViewMode) -> bool {
        let inputs = LayerInputs {
            revision: network.revision,
            isolated: isolated.clone(),
            mode,
        };
        if self.inputs.as_ref() == Some(&inputs) {
            return false;
        }

        self.markers.clear();
        self.polylines.clear();

        for node in &network.nodes {
            let Some((lat, lon)) = network.node_position(&node.id) else {
                continue;
            };
            self.markers.push(Marker {
                node_id: node.id.clone(),
                label: node.name.clone(),
                lat,
                lon,
                color: node_color(node),
            });
        }

        for edge in &network.edges {
            let (Some(from), Some(to)) = (
                network.node_position(&edge.from_node_id),
                network.node_position(&edge.to_node_id),
            ) else {
                continue;
            };
            self.polylines.push(Polyline {
                edge_id: edge.id.clone(),
                label: edge.name.clone(),
                from,
                to,
                color: edge_color(edge, mode, isolated),
                dashed: is_dashed(edge, isolated),
            });
        }

        self.inputs = Some(inputs);
        self.rebuilds += 1;
        true
    }

    /// Drop both layers, e.g. when the map is torn down.
    pub fn clear(&mut self) {
        self.markers.clear();
        self.polylines.clear();
        self.inputs = None;
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    /// How many times the layers have been rebuilt.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Extent of all markers with a margin, or a box around the default
    /// centre when there is nothing to show.
    pub fn bounds(&self) -> Bounds {
        let mut points = self.markers.iter().map(|m| (m.lat, m.lon));
        let Some(first) = points.next() else {
            return Bounds::around(DEFAULT_CENTER, 0.01);
        };
        let mut bounds = Bounds {
            lat: (first.0, first.0),
            lon: (first.1, first.1),
        };
        for (lat, lon) in points {
            bounds.lat = (bounds.lat.0.min(lat), bounds.lat.1.max(lat));
            bounds.lon = (bounds.lon.0.min(lon), bounds.lon.1.max(lon));
        }
        let margin_lat = ((bounds.lat.1 - bounds.lat.0) * 0.1).max(0.001);
        let margin_lon = ((bounds.lon.1 - bounds.lon.0) * 0.1).max(0.001);
        Bounds {
            lat: (bounds.lat.0 - margin_lat, bounds.lat.1 + margin_lat),
            lon: (bounds.lon.0 - margin_lon, bounds.lon.1 + margin_lon),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::network::palette;
    use crate::source::{EdgeRecord, NodeRecord, Topology};

    fn node(id: &str, kind: &str, lat: f64, lon: f64) -> NodeRecord {
        NodeRecord {
            id: id.into(),
            name: id.to_uppercase(),
            kind: kind.into(),
            x: lat,
            y: lon,
            pressure: None,
        }
    }

    fn pipe(id: &str, from: &str, to: &str) -> EdgeRecord {
        EdgeRecord {
            id: id.into(),
            name: id.to_uppercase(),
            status: "normal".into(),
            from_node_id: from.into(),
            to_node_id: to.into(),
            active_incident_count: Some(0),
            has_open_incidents: false,
            has_acknowledged_incidents: false,
            material: Some("pvc".into()),
            installation_date: None,
        }
    }

    fn network(revision: u64) -> NetworkData {
        NetworkData::from_topology(
            Topology {
                nodes: vec![
                    node("a", "tank", 37.0, -121.0),
                    node("b", "junction", 37.1, -121.1),
                ],
                edges: vec![pipe("p1", "a", "b"), pipe("p2", "a", "ghost")],
                incident_summary: None,
            },
            revision,
        )
    }

    #[test]
    fn test_unknown_endpoints_skipped() {
        let mut layers = MapLayers::new();
        assert!(layers.sync(&network(1), &BTreeSet::new(), ViewMode::Status));
        assert_eq!(layers.markers().len(), 2);
        assert_eq!(layers.polylines().len(), 1);

        let line = &layers.polylines()[0];
        assert_eq!(line.edge_id, "p1");
        assert_eq!(line.from, (37.0, -121.0));
        assert_eq!(line.color, palette::SKY);
        assert!(!line.dashed);
    }

    #[test]
    fn test_rebuild_only_on_input_change() {
        let net = network(1);
        let mut isolated = BTreeSet::new();
        let mut layers = MapLayers::new();

        assert!(layers.sync(&net, &isolated, ViewMode::Status));
        assert!(!layers.sync(&net, &isolated, ViewMode::Status));
        assert_eq!(layers.rebuilds(), 1);

        assert!(layers.sync(&net, &isolated, ViewMode::Material));
        isolated.insert("p1".to_string());
        assert!(layers.sync(&net, &isolated, ViewMode::Material));
        assert_eq!(layers.polylines()[0].color, palette::RED);
        assert!(layers.polylines()[0].dashed);

        assert!(layers.sync(&network(2), &isolated, ViewMode::Material));
        assert_eq!(layers.rebuilds(), 4);
        assert_eq!(layers.markers().len(), 2);
    }

    #[test]
    fn test_bounds() {
        let mut layers = MapLayers::new();
        let (lat, lon) = layers.bounds().center();
        assert!((lat - DEFAULT_CENTER.0).abs() < 1e-9);
        assert!((lon - DEFAULT_CENTER.1).abs() < 1e-9);

        layers.sync(&network(1), &BTreeSet::new(), ViewMode::Status);
        let b = layers.bounds();
        assert!(b.lat.0 < 37.0 && b.lat.1 > 37.1);
        assert!(b.lon.0 < -121.1 && b.lon.1 > -121.0);

        layers.clear();
        assert!(layers.markers().is_empty());
        assert!(layers.sync(&network(1), &BTreeSet::new(), ViewMode::Status));
    }
}
