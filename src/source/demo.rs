//! In-process demo network.
//!
//! A small simulated twin for running the dashboard without a backend:
//! readings jitter around their baselines, leaks can be injected and reset,
//! and a leaking pipe is isolated after a few ticks, which is announced on
//! the change feed just like the real backend does.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{
    DataSource, EdgeRecord, IncidentSummary, NodeRecord, SensorRow, Topology, TwinSnapshot,
};
use crate::api::{Action, ActionOutcome, ActionSink};
use crate::realtime::{EdgeChange, EdgeRow, Subscription};

/// Ticks a leak runs before the pipe is isolated.
pub const ISOLATION_DELAY_TICKS: u32 = 3;

const BASE_PRESSURE: f64 = 65.0;
const BASE_FLOW: f64 = 90.0;
const BASE_ACOUSTIC: f64 = 2.8;

const LEAK_PRESSURE: f64 = 48.0;
const LEAK_FLOW: f64 = 118.0;
const LEAK_ACOUSTIC: f64 = 7.2;

/// Condition of a pipe as far as its readings are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipeState {
    Normal,
    Leaking,
    Isolated,
}

/// Simulated network state.
#[derive(Debug)]
pub struct DemoNetwork {
    topology: Topology,
    sensors: Vec<SensorRow>,
    rng: StdRng,
    topology_dirty: bool,
    /// Leaking edge id -> ticks since the leak started.
    leaks: BTreeMap<String, u32>,
    changes: Option<mpsc::UnboundedSender<EdgeChange>>,
}

impl Default for DemoNetwork {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl DemoNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic network for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let topology = sample_topology();
        let sensors = sample_sensors(&topology);
        let mut network = Self {
            topology,
            sensors,
            rng,
            topology_dirty: true,
            leaks: BTreeMap::new(),
            changes: None,
        };
        network.recompute_incidents();
        network
    }

    /// Wrap for sharing between the source, the action sink and the feed.
    pub fn shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn sensors(&self) -> &[SensorRow] {
        &self.sensors
    }

    /// Subscribe to edge changes. Replaces any previous subscriber.
    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.changes = Some(tx);
        Subscription::from_channel(rx, "demo change feed")
    }

    /// Advance the simulation by one step.
    pub fn tick(&mut self) {
        let mut isolate = Vec::new();
        for (edge_id, ticks) in self.leaks.iter_mut() {
            *ticks += 1;
            if *ticks >= ISOLATION_DELAY_TICKS {
                isolate.push(edge_id.clone());
            }
        }
        for edge_id in isolate {
            self.leaks.remove(&edge_id);
            self.isolate(&edge_id);
        }
        self.jitter();
    }

    /// Re-read every sensor.
    pub fn refresh(&mut self) -> String {
        self.jitter();
        format!("Refreshed {} sensors", self.sensors.len())
    }

    /// Inject leak readings on one pipe.
    pub fn simulate_leak(&mut self, edge_id: &str) -> Result<String, String> {
        let edge = self.edge_mut(edge_id)?;
        edge.status = "critical".to_string();
        edge.has_open_incidents = true;
        edge.has_acknowledged_incidents = false;
        edge.active_incident_count = Some(1);
        let name = edge.name.clone();

        self.leaks.insert(edge_id.to_string(), 0);
        self.topology_dirty = true;
        self.recompute_incidents();
        self.jitter();
        info!(edge = %edge_id, "demo leak started");
        Ok(format!("Leak simulated on {}", name))
    }

    /// Restore normal readings on one pipe.
    pub fn reset(&mut self, edge_id: &str) -> Result<String, String> {
        let edge = self.edge_mut(edge_id)?;
        let was_isolated = edge.status == "isolated";
        edge.status = "normal".to_string();
        edge.has_open_incidents = false;
        edge.has_acknowledged_incidents = false;
        edge.active_incident_count = Some(0);
        let row = EdgeRow {
            id: edge.id.clone(),
            name: edge.name.clone(),
            status: edge.status.clone(),
        };

        self.leaks.remove(edge_id);
        self.topology_dirty = true;
        self.recompute_incidents();
        self.jitter();
        if was_isolated {
            self.emit(EdgeChange::update(row.clone(), None));
        }
        Ok(format!("Sensors reset on {}", row.name))
    }

    /// Take the topology if it changed since the last call.
    pub fn take_topology_update(&mut self) -> Option<Topology> {
        if self.topology_dirty {
            self.topology_dirty = false;
            Some(self.topology.clone())
        } else {
            None
        }
    }

    fn edge_mut(&mut self, edge_id: &str) -> Result<&mut EdgeRecord, String> {
        self.topology
            .edges
            .iter_mut()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| format!("Edge {} not found", edge_id))
    }

    fn isolate(&mut self, edge_id: &str) {
        let Ok(edge) = self.edge_mut(edge_id) else {
            return;
        };
        edge.status = "isolated".to_string();
        edge.has_open_incidents = false;
        edge.has_acknowledged_incidents = true;
        let row = EdgeRow {
            id: edge.id.clone(),
            name: edge.name.clone(),
            status: edge.status.clone(),
        };
        self.topology_dirty = true;
        self.recompute_incidents();
        info!(edge = %edge_id, "demo pipe isolated");
        self.emit(EdgeChange::update(row, None));
    }

    fn emit(&mut self, change: EdgeChange) {
        if let Some(tx) = &self.changes {
            if tx.send(change).is_err() {
                debug!("demo change feed has no subscriber");
                self.changes = None;
            }
        }
    }

    fn pipe_state(&self, edge_id: &str) -> PipeState {
        if self.leaks.contains_key(edge_id) {
            return PipeState::Leaking;
        }
        match self.topology.edges.iter().find(|e| e.id == edge_id) {
            Some(edge) if edge.status == "isolated" => PipeState::Isolated,
            _ => PipeState::Normal,
        }
    }

    /// New readings around each sensor's target value.
    fn jitter(&mut self) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        for i in 0..self.sensors.len() {
            let state = if self.sensors[i].asset_type == "edge" {
                self.pipe_state(&self.sensors[i].asset_id)
            } else {
                PipeState::Normal
            };
            let row = &mut self.sensors[i];
            if row.value.is_none() {
                continue;
            }
            let Some((target, spread)) = target_reading(&row.kind, state) else {
                continue;
            };
            let value = if target == 0.0 {
                0.0
            } else {
                (target + self.rng.gen_range(-spread..=spread)).max(0.0)
            };
            row.value = Some(value);
            row.last_seen = Some(now.clone());
            row.created_at = Some(now.clone());
        }
    }

    fn recompute_incidents(&mut self) {
        let mut summary = IncidentSummary::default();
        for edge in &self.topology.edges {
            let count = edge.active_incident_count.unwrap_or(0);
            if count > 0 {
                summary.total_active_incidents += count;
                summary.edges_with_active_incidents += 1;
            }
        }
        self.topology.incident_summary = Some(summary);
    }
}

/// Target value and noise spread for a reading kind.
fn target_reading(kind: &str, state: PipeState) -> Option<(f64, f64)> {
    let reading = match (kind, state) {
        ("pressure", PipeState::Normal) => (BASE_PRESSURE, 0.5),
        ("pressure", _) => (LEAK_PRESSURE, 0.5),
        ("flow", PipeState::Normal) => (BASE_FLOW, 1.0),
        ("flow", PipeState::Leaking) => (LEAK_FLOW, 1.0),
        ("flow", PipeState::Isolated) => (0.0, 0.0),
        ("acoustic", PipeState::Leaking) => (LEAK_ACOUSTIC, 0.1),
        ("acoustic", _) => (BASE_ACOUSTIC, 0.1),
        _ => return None,
    };
    Some(reading)
}

fn node(id: &str, name: &str, kind: &str, lat: f64, lon: f64) -> NodeRecord {
    NodeRecord {
        id: id.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        x: lat,
        y: lon,
        pressure: Some(BASE_PRESSURE),
    }
}

fn pipe(id: &str, name: &str, from: &str, to: &str, material: &str, installed: &str) -> EdgeRecord {
    EdgeRecord {
        id: id.to_string(),
        name: name.to_string(),
        status: "normal".to_string(),
        from_node_id: from.to_string(),
        to_node_id: to.to_string(),
        active_incident_count: Some(0),
        has_open_incidents: false,
        has_acknowledged_incidents: false,
        material: Some(material.to_string()),
        installation_date: Some(installed.to_string()),
    }
}

fn sample_topology() -> Topology {
    Topology {
        nodes: vec![
            node("n-r1", "Reservoir R1", "reservoir", 37.3420, -121.8900),
            node("n-t1", "Tank T1", "tank", 37.3310, -121.8720),
            node("n-j1", "Junction J1", "junction", 37.3390, -121.8850),
            node("n-j2", "Junction J2", "junction", 37.3365, -121.8815),
            node("n-j3", "Junction J3", "junction", 37.3340, -121.8870),
            node("n-j4", "Junction J4", "junction", 37.3330, -121.8780),
        ],
        edges: vec![
            pipe("e-p1", "P1", "n-r1", "n-j1", "iron", "1978-06-01"),
            pipe("e-p2", "P2", "n-j1", "n-j2", "pvc", "1995-03-15"),
            pipe("e-p3", "P3", "n-j1", "n-j3", "pe", "2015-09-30"),
            pipe("e-p4", "P4", "n-j2", "n-j4", "copper", "2003-11-20"),
            pipe("e-p5", "P5", "n-j3", "n-j4", "pvc", "2018-02-10"),
            pipe("e-p6", "P6", "n-j4", "n-t1", "iron", "1986-07-04"),
        ],
        incident_summary: None,
    }
}

fn sample_sensors(topology: &Topology) -> Vec<SensorRow> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut rows = Vec::new();
    let mut push = |asset_id: &str, asset_type: &str, kind: &str, value: f64, unit: &str| {
        rows.push(SensorRow {
            id: format!("s-{}-{}", asset_id, kind),
            asset_id: asset_id.to_string(),
            asset_type: asset_type.to_string(),
            kind: kind.to_string(),
            value: Some(value),
            unit: unit.to_string(),
            last_seen: Some(now.clone()),
            created_at: Some(now.clone()),
        });
    };

    for edge in &topology.edges {
        push(&edge.id, "edge", "pressure", BASE_PRESSURE, "psi");
        push(&edge.id, "edge", "flow", BASE_FLOW, "L/s");
        push(&edge.id, "edge", "acoustic", BASE_ACOUSTIC, "dB");
    }
    push("n-t1", "node", "pressure", BASE_PRESSURE, "psi");
    rows
}

/// Data source driven by a [`DemoNetwork`], ticking on a fixed interval.
#[derive(Debug)]
pub struct DemoSource {
    network: Arc<Mutex<DemoNetwork>>,
    interval: Duration,
    last_tick: Option<Instant>,
    forced: bool,
}

impl DemoSource {
    pub fn new(network: Arc<Mutex<DemoNetwork>>, interval: Duration) -> Self {
        Self {
            network,
            interval,
            last_tick: None,
            forced: false,
        }
    }

    /// Poll against an explicit clock.
    pub fn poll_at(&mut self, now: Instant) -> Option<TwinSnapshot> {
        let due = match self.last_tick {
            None => true,
            Some(last) => self.forced || now.saturating_duration_since(last) >= self.interval,
        };
        if !due {
            return None;
        }

        let mut network = self.network.lock().ok()?;
        if self.last_tick.is_some() {
            network.tick();
        }
        self.last_tick = Some(now);
        self.forced = false;

        Some(TwinSnapshot {
            topology: network.take_topology_update(),
            sensors: Some(network.sensors().to_vec()),
        })
    }
}

impl DataSource for DemoSource {
    fn poll(&mut self) -> Option<TwinSnapshot> {
        self.poll_at(Instant::now())
    }

    fn description(&self) -> &str {
        "demo network"
    }

    fn error(&self) -> Option<String> {
        match self.network.lock() {
            Ok(_) => None,
            Err(_) => Some("Demo network poisoned".to_string()),
        }
    }

    fn refresh(&mut self) {
        self.forced = true;
    }
}

/// Applies actions to a [`DemoNetwork`] synchronously.
#[derive(Debug)]
pub struct DemoActions {
    network: Arc<Mutex<DemoNetwork>>,
    pending: VecDeque<ActionOutcome>,
}

impl DemoActions {
    pub fn new(network: Arc<Mutex<DemoNetwork>>) -> Self {
        Self {
            network,
            pending: VecDeque::new(),
        }
    }
}

impl ActionSink for DemoActions {
    fn dispatch(&mut self, action: Action) {
        let result = match self.network.lock() {
            Ok(mut network) => match &action {
                Action::RefreshSensors => Ok(network.refresh()),
                Action::SimulateLeak { edge_id } => network.simulate_leak(edge_id),
                Action::ResetSensors { edge_id } => network.reset(edge_id),
            },
            Err(_) => Err("Demo network poisoned".to_string()),
        };
        self.pending.push_back(ActionOutcome {
            action,
            result: result.map(Some),
        });
    }

    fn poll_outcome(&mut self) -> Option<ActionOutcome> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(network: &DemoNetwork, asset: &str, kind: &str) -> f64 {
        network
            .sensors()
            .iter()
            .find(|s| s.asset_id == asset && s.kind == kind)
            .and_then(|s| s.value)
            .unwrap()
    }

    #[test]
    fn test_sample_network_is_consistent() {
        let network = DemoNetwork::seeded(1);
        let topology = network.topology();
        for edge in &topology.edges {
            assert!(topology.nodes.iter().any(|n| n.id == edge.from_node_id));
            assert!(topology.nodes.iter().any(|n| n.id == edge.to_node_id));
        }
        assert_eq!(network.sensors().len(), topology.edges.len() * 3 + 1);
        assert_eq!(
            topology.incident_summary,
            Some(IncidentSummary::default())
        );
    }

    #[test]
    fn test_jitter_stays_near_baseline() {
        let mut network = DemoNetwork::seeded(7);
        for _ in 0..20 {
            network.tick();
            let p = reading(&network, "e-p2", "pressure");
            assert!((BASE_PRESSURE - 0.5..=BASE_PRESSURE + 0.5).contains(&p));
            let f = reading(&network, "e-p2", "flow");
            assert!((BASE_FLOW - 1.0..=BASE_FLOW + 1.0).contains(&f));
        }
    }

    #[test]
    fn test_leak_then_isolation() {
        let mut network = DemoNetwork::seeded(3);
        let mut feed = network.subscribe();

        network.simulate_leak("e-p4").unwrap();
        assert!(reading(&network, "e-p4", "pressure") < 55.0);
        assert!(reading(&network, "e-p4", "acoustic") > 5.0);
        let summary = network.topology().incident_summary.unwrap();
        assert_eq!(summary.edges_with_active_incidents, 1);

        for _ in 0..ISOLATION_DELAY_TICKS - 1 {
            network.tick();
        }
        assert!(feed.poll().is_none());

        network.tick();
        let change = feed.poll().unwrap();
        assert_eq!(change.isolated_edge().unwrap().id, "e-p4");
        assert_eq!(reading(&network, "e-p4", "flow"), 0.0);

        let edge = network.topology().edges.iter().find(|e| e.id == "e-p4").unwrap();
        assert_eq!(edge.status, "isolated");
        assert!(edge.has_acknowledged_incidents);
    }

    #[test]
    fn test_reset_restores_and_notifies() {
        let mut network = DemoNetwork::seeded(3);
        let mut feed = network.subscribe();
        network.simulate_leak("e-p1").unwrap();
        for _ in 0..ISOLATION_DELAY_TICKS {
            network.tick();
        }
        assert!(feed.poll().is_some());

        let message = network.reset("e-p1").unwrap();
        assert_eq!(message, "Sensors reset on P1");
        let change = feed.poll().unwrap();
        assert_eq!(change.new_row.unwrap().status, "normal");
        assert!(reading(&network, "e-p1", "pressure") > 60.0);
        assert_eq!(
            network.topology().incident_summary.unwrap().total_active_incidents,
            0
        );
    }

    #[test]
    fn test_unknown_edge() {
        let mut network = DemoNetwork::seeded(1);
        assert_eq!(
            network.simulate_leak("nope").unwrap_err(),
            "Edge nope not found"
        );
        assert!(network.reset("nope").is_err());
    }

    #[test]
    fn test_source_ticks_on_interval() {
        let network = DemoNetwork::seeded(5).shared();
        let mut source = DemoSource::new(network, Duration::from_secs(2));
        let t0 = Instant::now();

        let first = source.poll_at(t0).unwrap();
        assert!(first.topology.is_some());
        assert!(first.sensors.is_some());

        assert!(source.poll_at(t0 + Duration::from_secs(1)).is_none());

        let second = source.poll_at(t0 + Duration::from_secs(2)).unwrap();
        assert!(second.topology.is_none());
        assert!(second.sensors.is_some());

        source.refresh();
        assert!(source.poll_at(t0 + Duration::from_millis(2100)).is_some());
    }

    #[test]
    fn test_actions_apply_and_report() {
        let network = DemoNetwork::seeded(5).shared();
        let mut actions = DemoActions::new(network.clone());

        actions.dispatch(Action::SimulateLeak {
            edge_id: "e-p3".into(),
        });
        actions.dispatch(Action::ResetSensors {
            edge_id: "missing".into(),
        });

        let ok = actions.poll_outcome().unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.result.unwrap().as_deref(), Some("Leak simulated on P3"));
        assert!(!actions.poll_outcome().unwrap().is_success());
        assert!(actions.poll_outcome().is_none());

        let mut guard = network.lock().unwrap();
        assert!(guard.take_topology_update().is_some());
    }
}
