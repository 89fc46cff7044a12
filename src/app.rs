//! Application state and navigation logic.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::api::{Action, ActionOutcome, ActionSink};
use crate::data::{
    collect_alerts, group_sensors, Alert, AnimationBoard, AnimationTiming, AssetKind,
    AssetSensors, HealthStatus, History, MapLayers, NetworkData, Thresholds, ViewMode,
};
use crate::realtime::{IsolationWatch, Subscription};
use crate::source::{DataSource, EdgeRecord, SensorRow, TwinSnapshot};
use crate::toast::{ToastLevel, Toasts};
use crate::ui::pipes::{sort_pipes_by, PipeSortColumn};
use crate::ui::Theme;

const MIN_ZOOM: f64 = 0.2;
const MAX_ZOOM: f64 = 5.0;

/// The current view/tab in the TUI.
///
/// Asset detail is shown as an overlay (controlled by `App::show_detail_overlay`)
/// rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Network map with pipes coloured by the current view mode.
    Map,
    /// Sortable table of every pipe.
    Pipes,
    /// Sensor cards grouped by asset.
    Sensors,
    /// Unhealthy readings and troubled pipes.
    Alerts,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Map => View::Pipes,
            View::Pipes => View::Sensors,
            View::Sensors => View::Alerts,
            View::Alerts => View::Map,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Map => View::Alerts,
            View::Pipes => View::Map,
            View::Sensors => View::Pipes,
            View::Alerts => View::Sensors,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Map => "Map",
            View::Pipes => "Pipes",
            View::Sensors => "Sensors",
            View::Alerts => "Alerts",
        }
    }
}

/// Something on the map that can be selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapItem {
    Node(String),
    Pipe(String),
}

/// What the detail overlay describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailTarget {
    Node(String),
    Pipe(String),
}

/// Display options resolved from settings and CLI flags.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub thresholds: Thresholds,
    pub timing: AnimationTiming,
    pub view_mode: ViewMode,
    pub directional_arrows: bool,
    pub map_labels: bool,
    pub export_path: PathBuf,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            timing: AnimationTiming::default(),
            view_mode: ViewMode::default(),
            directional_arrows: true,
            map_labels: true,
            export_path: PathBuf::from("twin_export.json"),
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    // Inputs
    source: Box<dyn DataSource>,
    actions: Box<dyn ActionSink>,
    realtime: Option<Subscription>,
    refresh_requested: bool,

    // Twin state
    pub network: Option<NetworkData>,
    pub sensor_rows: Option<Vec<SensorRow>>,
    pub sensors: Vec<AssetSensors>,
    pub alerts: Vec<Alert>,
    pub board: AnimationBoard,
    pub history: History,
    pub layers: MapLayers,
    pub isolation: IsolationWatch,
    pub load_error: Option<String>,
    pub last_sensor_update: Option<Instant>,
    pub thresholds: Thresholds,

    // Map
    pub view_mode: ViewMode,
    pub directional_arrows: bool,
    pub map_labels: bool,
    /// Map extent factor; below 1 zooms in.
    pub map_zoom: f64,

    // Navigation state
    pub selected_map_index: usize,
    pub selected_pipe_index: usize,
    pub selected_sensor_index: usize,
    pub selected_alert_index: usize,

    // Sorting (Pipes view)
    pub pipe_sort_column: PipeSortColumn,
    pub pipe_sort_ascending: bool,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    // UI
    pub theme: Theme,
    pub toasts: Toasts,
    export_path: PathBuf,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App with the given data source and action sink.
    pub fn new(source: Box<dyn DataSource>, actions: Box<dyn ActionSink>, options: AppOptions) -> Self {
        Self {
            running: true,
            current_view: View::Map,
            show_help: false,
            show_detail_overlay: false,
            source,
            actions,
            realtime: None,
            refresh_requested: false,
            network: None,
            sensor_rows: None,
            sensors: Vec::new(),
            alerts: Vec::new(),
            board: AnimationBoard::new(options.timing),
            history: History::new(),
            layers: MapLayers::new(),
            isolation: IsolationWatch::new(),
            load_error: None,
            last_sensor_update: None,
            thresholds: options.thresholds,
            view_mode: options.view_mode,
            directional_arrows: options.directional_arrows,
            map_labels: options.map_labels,
            map_zoom: 1.0,
            selected_map_index: 0,
            selected_pipe_index: 0,
            selected_sensor_index: 0,
            selected_alert_index: 0,
            pipe_sort_column: PipeSortColumn::default(),
            pipe_sort_ascending: true,
            filter_text: String::new(),
            filter_active: false,
            theme: Theme::auto_detect(),
            toasts: Toasts::default(),
            export_path: options.export_path,
            status_message: None,
        }
    }

    /// Attach a realtime change-feed subscription.
    pub fn with_realtime(mut self, subscription: Subscription) -> Self {
        self.realtime = Some(subscription);
        self
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Description of the change feed, if one is attached.
    pub fn realtime_description(&self) -> Option<&str> {
        self.realtime.as_ref().map(|s| s.description())
    }

    pub fn realtime_error(&self) -> Option<String> {
        self.realtime.as_ref().and_then(|s| s.error())
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Get breadcrumb trail for current navigation.
    pub fn breadcrumb(&self) -> String {
        if self.current_view == View::Map {
            format!("Map > {}", self.view_mode.label())
        } else {
            self.current_view.label().to_string()
        }
    }

    /// Per-frame work: drain the change feed and action outcomes, advance
    /// timers. Source polling runs on its own interval via [`App::reload_data`].
    pub fn update(&mut self, now: Instant) -> bool {
        let mut changed = self.poll_realtime(now);
        changed |= self.poll_actions(now);
        changed |= self.tick(now);
        changed
    }

    /// Whether something asked for a reload ahead of the refresh interval.
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    /// Poll the data source for new data.
    ///
    /// Returns Ok(true) if new data was received, Ok(false) if no new data,
    /// or Err if there was an error.
    pub fn reload_data(&mut self) -> Result<bool> {
        let now = Instant::now();
        // An error on one endpoint does not stop data from the other
        self.load_error = self.source.error();

        match self.source.poll() {
            Some(snapshot) if !snapshot.is_empty() => {
                self.apply_snapshot(snapshot, now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Fold a snapshot into the twin state.
    pub fn apply_snapshot(&mut self, snapshot: TwinSnapshot, now: Instant) {
        let topology_changed = snapshot.topology.is_some();
        if let Some(topology) = snapshot.topology {
            let revision = self.network.as_ref().map_or(1, |n| n.revision + 1);
            let network = NetworkData::from_topology(topology, revision);
            self.isolation.sync_topology(network.isolation_states());
            debug!(
                nodes = network.nodes.len(),
                edges = network.edges.len(),
                revision,
                "topology applied"
            );
            self.network = Some(network);
        }

        if let Some(rows) = snapshot.sensors {
            self.regroup_sensors(&rows, now);
            self.history.record(&self.sensors);
            self.history.retain(&self.sensors);
            self.sensor_rows = Some(rows);
            self.last_sensor_update = Some(now);
        } else if topology_changed {
            // Names come from the topology; readings are unchanged
            if let Some(rows) = self.sensor_rows.take() {
                self.regroup_sensors(&rows, now);
                self.sensor_rows = Some(rows);
            }
        }

        self.refresh_derived();
        self.clamp_selections();
    }

    fn regroup_sensors(&mut self, rows: &[SensorRow], now: Instant) {
        self.sensors = group_sensors(rows, self.network.as_ref(), &self.thresholds);
        let report = self.board.sync(&self.sensors, now);
        if report.mounted + report.unmounted + report.transitions > 0 {
            debug!(
                mounted = report.mounted,
                unmounted = report.unmounted,
                transitions = report.transitions,
                "sensor displays synced"
            );
        }
    }

    /// Rebuild alerts and map layers from the current state.
    fn refresh_derived(&mut self) {
        self.alerts = collect_alerts(&self.sensors, self.network.as_ref(), self.isolation.isolated());
        if let Some(ref network) = self.network {
            self.layers
                .sync(network, self.isolation.isolated(), self.view_mode);
        }
    }

    /// Drain the change feed.
    pub fn poll_realtime(&mut self, now: Instant) -> bool {
        let Some(subscription) = self.realtime.as_mut() else {
            return false;
        };

        let mut changes = Vec::new();
        while let Some(change) = subscription.poll() {
            changes.push(change);
        }
        if changes.is_empty() {
            return false;
        }

        for change in &changes {
            if let Some(notice) = self.isolation.observe(change) {
                info!(edge = %notice.edge_id, "pipe isolated");
                self.toasts.push_with(
                    ToastLevel::Alert,
                    notice.title(),
                    Some(notice.description().to_string()),
                    now,
                );
            }
            if let (true, Some(row), Some(network)) =
                (change.is_edge_update(), change.new_row.as_ref(), self.network.as_mut())
            {
                if !row.status.is_empty() {
                    network.set_edge_status(&row.id, &row.status);
                }
            }
        }

        self.refresh_derived();
        true
    }

    /// Surface finished actions as toasts.
    pub fn poll_actions(&mut self, now: Instant) -> bool {
        let mut any = false;
        while let Some(outcome) = self.actions.poll_outcome() {
            any = true;
            self.show_outcome(outcome, now);
        }
        any
    }

    fn show_outcome(&mut self, outcome: ActionOutcome, now: Instant) {
        match outcome.result {
            Ok(message) => {
                self.toasts.push_with(
                    ToastLevel::Success,
                    format!("{} complete", outcome.action.label()),
                    message,
                    now,
                );
                // Pull the effect of the action without waiting for the next tick
                self.request_refresh();
            }
            Err(error) => {
                warn!(action = %outcome.action.label(), %error, "action failed");
                self.toasts.push_with(
                    ToastLevel::Error,
                    format!("{} failed", outcome.action.label()),
                    Some(error),
                    now,
                );
            }
        }
    }

    /// Advance animations and expire toasts.
    pub fn tick(&mut self, now: Instant) -> bool {
        let animated = self.board.tick(now);
        let expired = self.toasts.expire(now);
        animated || expired
    }

    /// Earliest animation deadline, so the loop can wake in time.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.board.next_deadline()
    }

    /// Send an action to the backend.
    pub fn trigger(&mut self, action: Action) {
        info!(action = %action.label(), "action requested");
        self.set_status_message(format!("{} requested", action.label()));
        self.actions.dispatch(action);
    }

    /// Ask for a fresh sensor read and an immediate poll.
    pub fn refresh_sensors(&mut self) {
        self.trigger(Action::RefreshSensors);
        self.request_refresh();
    }

    fn request_refresh(&mut self) {
        self.source.refresh();
        self.refresh_requested = true;
    }

    /// Inject a leak on the selected pipe.
    pub fn simulate_leak_on_selection(&mut self) {
        match self.selected_pipe_id() {
            Some(edge_id) => self.trigger(Action::SimulateLeak { edge_id }),
            None => self.set_status_message("Select a pipe first".to_string()),
        }
    }

    /// Reset sensors on the selected pipe.
    pub fn reset_selection(&mut self) {
        match self.selected_pipe_id() {
            Some(edge_id) => self.trigger(Action::ResetSensors { edge_id }),
            None => self.set_status_message("Select a pipe first".to_string()),
        }
    }

    /// Cycle how the map colours pipes.
    pub fn cycle_view_mode(&mut self) {
        self.view_mode = self.view_mode.next();
        self.refresh_derived();
        self.set_status_message(format!("Map view: {}", self.view_mode.label()));
    }

    /// Zoom the map in one step.
    pub fn zoom_in(&mut self) {
        self.map_zoom = (self.map_zoom * 0.8).max(MIN_ZOOM);
    }

    /// Zoom the map out one step.
    pub fn zoom_out(&mut self) {
        self.map_zoom = (self.map_zoom * 1.25).min(MAX_ZOOM);
    }

    /// Switch to the next view (Map → Pipes → Sensors → Alerts).
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.item_count().saturating_sub(1);
        let index = self.selected_index_mut();
        *index = (*index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        let index = self.selected_index_mut();
        *index = index.saturating_sub(n);
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        *self.selected_index_mut() = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        let last = self.item_count().saturating_sub(1);
        *self.selected_index_mut() = last;
    }

    /// Select a row by its visual position, if it exists.
    pub fn select_row(&mut self, row: usize) {
        if row < self.item_count() {
            *self.selected_index_mut() = row;
        }
    }

    fn selected_index_mut(&mut self) -> &mut usize {
        match self.current_view {
            View::Map => &mut self.selected_map_index,
            View::Pipes => &mut self.selected_pipe_index,
            View::Sensors => &mut self.selected_sensor_index,
            View::Alerts => &mut self.selected_alert_index,
        }
    }

    /// Number of selectable items in the current view.
    pub fn item_count(&self) -> usize {
        match self.current_view {
            View::Map => self.map_items().len(),
            View::Pipes => self.visible_pipes().len(),
            View::Sensors => self.visible_sensor_groups().len(),
            View::Alerts => self.visible_alerts().len(),
        }
    }

    fn clamp_selections(&mut self) {
        let view = self.current_view;
        for v in [View::Map, View::Pipes, View::Sensors, View::Alerts] {
            self.current_view = v;
            let max = self.item_count().saturating_sub(1);
            let index = self.selected_index_mut();
            *index = (*index).min(max);
        }
        self.current_view = view;
    }

    /// Selectable map items: markers first, then pipes, in layer order.
    pub fn map_items(&self) -> Vec<MapItem> {
        self.layers
            .markers()
            .iter()
            .map(|m| MapItem::Node(m.node_id.clone()))
            .chain(
                self.layers
                    .polylines()
                    .iter()
                    .map(|p| MapItem::Pipe(p.edge_id.clone())),
            )
            .collect()
    }

    pub fn selected_map_item(&self) -> Option<MapItem> {
        self.map_items().into_iter().nth(self.selected_map_index)
    }

    /// Pipes after filtering and sorting, as shown in the Pipes view.
    pub fn visible_pipes(&self) -> Vec<&EdgeRecord> {
        let Some(ref network) = self.network else {
            return Vec::new();
        };
        let mut pipes: Vec<&EdgeRecord> = network
            .edges
            .iter()
            .filter(|e| {
                self.matches_filter(&e.name)
                    || self.matches_filter(&e.id)
                    || self.matches_filter(&e.status)
            })
            .collect();
        sort_pipes_by(
            &mut pipes,
            self.pipe_sort_column,
            self.pipe_sort_ascending,
            self.isolation.isolated(),
        );
        pipes
    }

    /// Sensor groups matching the filter.
    pub fn visible_sensor_groups(&self) -> Vec<&AssetSensors> {
        self.sensors
            .iter()
            .filter(|g| self.matches_filter(&g.name) || self.matches_filter(&g.asset_id))
            .collect()
    }

    /// Alerts matching the filter.
    pub fn visible_alerts(&self) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|a| self.matches_filter(&a.asset_name) || self.matches_filter(&a.summary()))
            .collect()
    }

    /// Id of the pipe the current selection refers to, if any.
    pub fn selected_pipe_id(&self) -> Option<String> {
        match self.detail_target()? {
            DetailTarget::Pipe(id) => Some(id),
            DetailTarget::Node(_) => None,
        }
    }

    /// What the detail overlay would show for the current selection.
    pub fn detail_target(&self) -> Option<DetailTarget> {
        match self.current_view {
            View::Map => match self.selected_map_item()? {
                MapItem::Node(id) => Some(DetailTarget::Node(id)),
                MapItem::Pipe(id) => Some(DetailTarget::Pipe(id)),
            },
            View::Pipes => self
                .visible_pipes()
                .get(self.selected_pipe_index)
                .map(|e| DetailTarget::Pipe(e.id.clone())),
            View::Sensors => self
                .visible_sensor_groups()
                .get(self.selected_sensor_index)
                .map(|g| target_for(g.asset_kind, &g.asset_id)),
            View::Alerts => self
                .visible_alerts()
                .get(self.selected_alert_index)
                .map(|a| target_for(a.asset_kind, &a.asset_id)),
        }
    }

    /// Sensor group for an asset.
    pub fn sensors_for(&self, asset_id: &str) -> Option<&AssetSensors> {
        self.sensors.iter().find(|g| g.asset_id == asset_id)
    }

    /// Open the detail overlay for the current selection.
    pub fn enter_detail(&mut self) {
        if self.detail_target().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close overlay first, then clear the filter, then go to the map.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
            return;
        }
        if !self.filter_text.is_empty() {
            self.clear_filter();
            return;
        }
        if self.current_view != View::Map {
            self.current_view = View::Map;
        }
    }

    /// Close the detail overlay if open.
    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Cycle to the next sort column (Pipes view).
    pub fn cycle_sort(&mut self) {
        if self.current_view == View::Pipes {
            self.pipe_sort_column = self.pipe_sort_column.next();
        }
    }

    /// Toggle sort direction between ascending and descending.
    pub fn toggle_sort_direction(&mut self) {
        if self.current_view == View::Pipes {
            self.pipe_sort_ascending = !self.pipe_sort_ascending;
        }
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode without clearing the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear the filter text and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
    }

    /// Append a character to the filter text.
    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.clamp_selections();
    }

    /// Remove the last character from the filter text.
    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
    }

    /// Check if a name matches the current filter.
    pub fn matches_filter(&self, name: &str) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        name.to_lowercase().contains(&self.filter_text.to_lowercase())
    }

    /// Whether the first sensor fetch has not completed yet.
    pub fn sensors_loading(&self) -> bool {
        self.sensor_rows.is_none()
    }

    /// Worst health across readings and pipes.
    pub fn overall_health(&self) -> HealthStatus {
        self.alerts
            .iter()
            .map(|a| a.status)
            .max()
            .unwrap_or(HealthStatus::Healthy)
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
        self.teardown();
    }

    /// Release subscriptions and timers.
    pub fn teardown(&mut self) {
        if let Some(mut subscription) = self.realtime.take() {
            subscription.unsubscribe();
        }
        let cancelled = self.board.clear();
        self.layers.clear();
        debug!(cancelled, "dashboard torn down");
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    /// Current twin state as JSON.
    pub fn export_value(&self) -> Result<serde_json::Value> {
        if self.network.is_none() && self.sensor_rows.is_none() {
            anyhow::bail!("No data to export");
        }

        let stats = self.network.as_ref().map(|n| n.stats()).unwrap_or_default();
        let isolated: Vec<&String> = self.isolation.isolated().iter().collect();

        let pipes: Vec<serde_json::Value> = self
            .network
            .iter()
            .flat_map(|n| &n.edges)
            .map(|e| {
                serde_json::json!({
                    "id": e.id,
                    "name": e.name,
                    "status": e.status,
                    "material": e.material,
                    "installation_date": e.installation_date,
                    "active_incident_count": e.active_incident_count,
                    "health": format!("{:?}", crate::data::network::edge_health(e, self.isolation.isolated())),
                    "color": crate::data::network::edge_color(e, self.view_mode, self.isolation.isolated()).hex(),
                })
            })
            .collect();

        let sensors: Vec<serde_json::Value> = self
            .sensors
            .iter()
            .map(|g| {
                serde_json::json!({
                    "asset_id": g.asset_id,
                    "asset_type": g.asset_kind.label(),
                    "name": g.name,
                    "health": format!("{:?}", g.health()),
                    "readings": g.sensors.iter().map(|s| {
                        serde_json::json!({
                            "type": s.kind.label(),
                            "value": s.value,
                            "unit": s.unit,
                            "status": format!("{:?}", s.status),
                            "last_seen": s.last_seen.map(|t| t.to_rfc3339()),
                        })
                    }).collect::<Vec<_>>(),
                })
            })
            .collect();

        let alerts: Vec<serde_json::Value> = self
            .alerts
            .iter()
            .map(|a| {
                serde_json::json!({
                    "asset_id": a.asset_id,
                    "asset_name": a.asset_name,
                    "status": format!("{:?}", a.status),
                    "summary": a.summary(),
                })
            })
            .collect();

        Ok(serde_json::json!({
            "summary": {
                "nodes": stats.nodes,
                "pipes": stats.pipes,
                "active_incidents": stats.active_incidents,
                "pipes_affected": stats.pipes_affected,
                "isolated": isolated,
                "view_mode": self.view_mode.label(),
            },
            "pipes": pipes,
            "sensors": sensors,
            "alerts": alerts,
        }))
    }

    /// Export current state to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        use std::io::Write;

        let json = serde_json::to_string_pretty(&self.export_value()?)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        info!(path = %path.display(), "state exported");
        Ok(())
    }
}

fn target_for(kind: AssetKind, id: &str) -> DetailTarget {
    match kind {
        AssetKind::Pipe => DetailTarget::Pipe(id.to_string()),
        AssetKind::Node | AssetKind::Other => DetailTarget::Node(id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NoActions;
    use crate::realtime::{EdgeChange, EdgeRow};
    use crate::source::{ChannelSource, DemoActions, DemoNetwork, DemoSource, NodeRecord, Topology};
    use tokio::sync::mpsc;

    fn channel_app() -> App {
        let (_tx, source) = ChannelSource::create("test");
        App::new(Box::new(source), Box::new(NoActions::default()), AppOptions::default())
    }

    fn node(id: &str, x: f64) -> NodeRecord {
        NodeRecord {
            id: id.into(),
            name: id.to_uppercase(),
            kind: "junction".into(),
            x,
            y: -121.88,
            pressure: None,
        }
    }

    fn main_street(status: &str) -> Topology {
        Topology {
            nodes: vec![node("n1", 37.33), node("n2", 37.34)],
            edges: vec![EdgeRecord {
                id: "edge-main-0001".into(),
                name: "Main St".into(),
                status: status.into(),
                from_node_id: "n1".into(),
                to_node_id: "n2".into(),
                active_incident_count: Some(0),
                has_open_incidents: false,
                has_acknowledged_incidents: false,
                material: None,
                installation_date: None,
            }],
            incident_summary: None,
        }
    }

    fn pressure_row(value: f64) -> SensorRow {
        SensorRow {
            id: "s1".into(),
            asset_id: "edge-main-0001".into(),
            asset_type: "edge".into(),
            kind: "pressure".into(),
            value: Some(value),
            unit: "psi".into(),
            last_seen: None,
            created_at: None,
        }
    }

    fn demo_app() -> App {
        let network = DemoNetwork::seeded(11).shared();
        let source = DemoSource::new(network.clone(), Duration::from_secs(3600));
        App::new(
            Box::new(source),
            Box::new(DemoActions::new(network)),
            AppOptions::default(),
        )
    }

    #[test]
    fn test_view_cycle() {
        assert_eq!(View::Map.next(), View::Pipes);
        assert_eq!(View::Alerts.next(), View::Map);
        assert_eq!(View::Map.prev(), View::Alerts);
    }

    #[test]
    fn test_first_poll_loads_everything() {
        let mut app = demo_app();
        assert!(app.sensors_loading());
        assert!(app.reload_data().unwrap());

        assert!(!app.sensors_loading());
        assert_eq!(app.network.as_ref().unwrap().edges.len(), 6);
        assert_eq!(app.layers.polylines().len(), 6);
        assert_eq!(app.layers.markers().len(), 6);
        assert_eq!(app.sensors.len(), 7);
        assert_eq!(app.sensors[0].asset_kind, AssetKind::Pipe);
        assert_eq!(app.board.len(), 19);
        assert_eq!(app.overall_health(), HealthStatus::Healthy);
    }

    #[test]
    fn test_leak_action_flows_into_alerts() {
        let mut app = demo_app();
        let now = Instant::now();
        app.reload_data().unwrap();

        app.set_view(View::Pipes);
        let target = app.selected_pipe_id().unwrap();
        app.simulate_leak_on_selection();
        app.update(now);
        assert!(app.take_refresh_request());
        assert!(!app.take_refresh_request());
        assert!(app.reload_data().unwrap());

        let toast = app.toasts.iter().last().unwrap();
        assert_eq!(toast.level, ToastLevel::Success);
        assert!(app
            .alerts
            .iter()
            .any(|a| a.asset_id == target && a.status == HealthStatus::Critical));
        assert_eq!(app.overall_health(), HealthStatus::Critical);
    }

    #[test]
    fn test_isolation_toast_once() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = demo_app().with_realtime(Subscription::from_channel(rx, "test"));
        let now = Instant::now();
        app.reload_data().unwrap();

        let change = EdgeChange::update(
            EdgeRow {
                id: "e-p2".into(),
                name: "P2".into(),
                status: "isolated".into(),
            },
            None,
        );
        tx.send(change.clone()).unwrap();
        tx.send(change).unwrap();
        assert!(app.poll_realtime(now));

        let alerts: Vec<_> = app.toasts.iter().filter(|t| t.level == ToastLevel::Alert).collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "Pipe P2 has been isolated");
        assert!(app.isolation.is_isolated("e-p2"));

        let line = app
            .layers
            .polylines()
            .iter()
            .find(|p| p.edge_id == "e-p2")
            .unwrap();
        assert!(line.dashed);
        assert_eq!(line.color.hex(), "#ef4444");
    }

    #[test]
    fn test_topology_restoring_pipe_clears_isolation() {
        let mut app = channel_app();
        let now = Instant::now();

        app.apply_snapshot(TwinSnapshot::topology(main_street("isolated")), now);
        assert!(app.isolation.is_isolated("edge-main-0001"));
        assert_eq!(app.layers.polylines()[0].color.hex(), "#ef4444");
        assert!(app.alerts.iter().any(|a| a.asset_id == "edge-main-0001"));

        app.apply_snapshot(TwinSnapshot::topology(main_street("normal")), now);
        assert!(!app.isolation.is_isolated("edge-main-0001"));
        let line = &app.layers.polylines()[0];
        assert_eq!(line.color.hex(), "#0ea5e9");
        assert!(!line.dashed);
        assert!(app.alerts.is_empty());
    }

    #[test]
    fn test_late_topology_names_sensor_groups() {
        let mut app = channel_app();
        let now = Instant::now();

        app.apply_snapshot(TwinSnapshot::sensors(vec![pressure_row(64.0)]), now);
        assert_eq!(app.sensors[0].name, "edge-mai");

        app.apply_snapshot(TwinSnapshot::topology(main_street("normal")), now);
        assert_eq!(app.sensors[0].name, "Main St");
        assert_eq!(app.sensors[0].asset_kind, AssetKind::Pipe);
        // Regrouping is not a new reading
        assert_eq!(app.history.values(&app.sensors[0].sensors[0].key).unwrap().len(), 1);
        assert_eq!(app.board.len(), 1);
    }

    #[test]
    fn test_no_actions_reports_error() {
        let (_tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source), Box::new(NoActions::default()), AppOptions::default());
        app.refresh_sensors();
        app.poll_actions(Instant::now());
        let toast = app.toasts.iter().next().unwrap();
        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.description.as_deref(), Some("No backend API configured"));
    }

    #[test]
    fn test_leak_without_selection() {
        let (_tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source), Box::new(NoActions::default()), AppOptions::default());
        app.simulate_leak_on_selection();
        assert_eq!(app.get_status_message(), Some("Select a pipe first"));
        assert!(!app.poll_actions(Instant::now()));
    }

    #[test]
    fn test_filter_and_selection() {
        let mut app = demo_app();
        app.reload_data().unwrap();
        app.set_view(View::Pipes);
        app.select_last();
        assert_eq!(app.selected_pipe_index, 5);

        app.filter_push('p');
        app.filter_push('4');
        assert_eq!(app.visible_pipes().len(), 1);
        assert_eq!(app.selected_pipe_index, 0);
        assert_eq!(app.selected_pipe_id().as_deref(), Some("e-p4"));

        app.go_back();
        assert!(app.filter_text.is_empty());
        app.go_back();
        assert_eq!(app.current_view, View::Map);
    }

    #[test]
    fn test_map_selection_and_detail() {
        let mut app = demo_app();
        app.reload_data().unwrap();
        assert!(matches!(app.detail_target(), Some(DetailTarget::Node(_))));
        app.select_last();
        assert!(matches!(app.detail_target(), Some(DetailTarget::Pipe(_))));
        app.enter_detail();
        assert!(app.show_detail_overlay);
        app.go_back();
        assert!(!app.show_detail_overlay);
    }

    #[test]
    fn test_view_mode_rebuilds_layers() {
        let mut app = demo_app();
        app.reload_data().unwrap();
        let before = app.layers.rebuilds();
        app.cycle_view_mode();
        assert_eq!(app.view_mode, ViewMode::Material);
        assert_eq!(app.layers.rebuilds(), before + 1);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut app = demo_app();
        for _ in 0..50 {
            app.zoom_in();
        }
        assert_eq!(app.map_zoom, MIN_ZOOM);
        for _ in 0..50 {
            app.zoom_out();
        }
        assert_eq!(app.map_zoom, MAX_ZOOM);
    }

    #[test]
    fn test_quit_cancels_timers() {
        let mut app = demo_app();
        let now = Instant::now();
        app.reload_data().unwrap();
        app.refresh_sensors();
        app.update(now);
        app.reload_data().unwrap();
        assert!(app.next_deadline().is_some());
        app.quit();
        assert!(!app.running);
        assert!(app.board.is_empty());
        assert_eq!(app.next_deadline(), None);
    }

    #[test]
    fn test_export() {
        let mut app = demo_app();
        assert!(app.export_value().is_err());
        app.reload_data().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        app.export_state(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["pipes"], 6);
        assert_eq!(value["sensors"].as_array().unwrap().len(), 7);
    }
}
