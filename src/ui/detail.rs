//! Detail overlay rendering.
//!
//! Displays a modal overlay describing the selected node or pipe: the map
//! popup text, incident state, and the asset's current sensor readings.

use std::collections::BTreeSet;
use std::time::Instant;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, DetailTarget};
use crate::data::history::sparkline_str;
use crate::data::network::{edge_color, edge_health, installation_year, node_color};
use crate::data::{AssetSensors, HealthStatus, ViewMode};
use crate::source::{EdgeRecord, NodeRecord};
use crate::ui::animated::{missing_span, value_spans};
use crate::ui::theme::swatch_color;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 14;

/// Popup text for a node: name, type badge, pressure when known.
pub fn node_popup(node: &NodeRecord) -> Vec<String> {
    let mut lines = vec![node.name.clone(), format!("[{}]", node.kind)];
    if let Some(pressure) = node.pressure.filter(|p| p.is_finite()) {
        lines.push(format!("Pressure: {:.1} psi", pressure));
    }
    lines
}

/// Popup text for a pipe, depending on how the map is coloured.
pub fn edge_popup(edge: &EdgeRecord, mode: ViewMode, isolated: &BTreeSet<String>) -> Vec<String> {
    let mut lines = vec![edge.name.clone()];
    match mode {
        ViewMode::Material => lines.push(format!(
            "Material: {}",
            edge.material.as_deref().unwrap_or("Unknown")
        )),
        ViewMode::Age => lines.push(format!(
            "Installed: {}",
            edge.installation_date.as_deref().unwrap_or("Unknown")
        )),
        ViewMode::Status => {
            let status = if isolated.contains(&edge.id) {
                "isolated"
            } else {
                edge.status.as_str()
            };
            lines.push(format!("[{}]", status));
        }
    }
    if let Some(ref material) = edge.material {
        let year = installation_year(edge)
            .map(|y| y.to_string())
            .unwrap_or_else(|| "?".to_string());
        lines.push(format!("{} • {}", material, year));
    }
    lines
}

/// Render the detail of the current selection as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }
    let Some(ref network) = app.network else {
        return;
    };
    let Some(target) = app.detail_target() else {
        return;
    };

    let isolated = app.isolation.isolated();
    let (asset_id, header_lines, border) = match &target {
        DetailTarget::Node(id) => {
            let Some(node) = network.node(id) else {
                return;
            };
            let swatch = node_color(node);
            let mut lines = popup_lines(node_popup(node), swatch_color(swatch));
            lines.push(Line::from(Span::styled(
                format!(" {:.5}, {:.5}", node.x, node.y),
                Style::default().add_modifier(Modifier::DIM),
            )));
            (id.clone(), lines, swatch_color(swatch))
        }
        DetailTarget::Pipe(id) => {
            let Some(edge) = network.edge(id) else {
                return;
            };
            let swatch = edge_color(edge, app.view_mode, isolated);
            let mut lines = popup_lines(
                edge_popup(edge, app.view_mode, isolated),
                swatch_color(swatch),
            );

            let endpoint = |id: &str| {
                network
                    .node(id)
                    .map_or_else(|| id.to_string(), |n| n.name.clone())
            };
            let (from, to) = (endpoint(&edge.from_node_id), endpoint(&edge.to_node_id));
            lines.push(Line::from(Span::styled(
                format!(" {} → {}", from, to),
                Style::default().add_modifier(Modifier::DIM),
            )));

            let health = edge_health(edge, isolated);
            let incidents = match edge.active_incident_count.unwrap_or(0) {
                0 => "No active incidents".to_string(),
                n if edge.has_open_incidents => format!("{} open incident(s)", n),
                n => format!("{} acknowledged incident(s)", n),
            };
            lines.push(Line::from(vec![
                Span::raw(" Health: "),
                Span::styled(
                    health.symbol(),
                    app.theme.status_style(health).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("    {}", incidents)),
            ]));
            (id.clone(), lines, swatch_color(swatch))
        }
    };

    let sensors = app.sensors_for(&asset_id);

    let overlay_width = (area.width * 80 / 100).clamp(MIN_OVERLAY_WIDTH, 90);
    let overlay_height = (area.height * 80 / 100).clamp(MIN_OVERLAY_HEIGHT, 30);
    let overlay_area = crate::ui::common::centered(area, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let header_height = header_lines.len() as u16 + 2;
    let chunks = Layout::vertical([
        Constraint::Length(header_height),
        Constraint::Min(4),
        Constraint::Length(1),
    ])
    .split(overlay_area);

    // ===== HEADER SECTION =====
    let title = match &target {
        DetailTarget::Node(_) => " Node Detail ",
        DetailTarget::Pipe(_) => " Pipe Detail ",
    };
    let header = Paragraph::new(header_lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(header, chunks[0]);

    // ===== SENSORS SECTION =====
    render_sensor_table(frame, app, sensors, chunks[1]);

    // ===== FOOTER =====
    let hint = match &target {
        DetailTarget::Pipe(_) => " L:simulate leak  R:reset sensors  Esc:close ",
        DetailTarget::Node(_) => " Press Esc to close ",
    };
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        hint,
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}

/// First line bold, badges in the asset's map colour.
fn popup_lines(text: Vec<String>, accent: ratatui::style::Color) -> Vec<Line<'static>> {
    text.into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                Line::from(Span::styled(
                    format!(" {} ", line),
                    Style::default().add_modifier(Modifier::BOLD),
                ))
            } else if line.starts_with('[') {
                Line::from(Span::styled(
                    format!(" {}", line),
                    Style::default().fg(accent).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!(" {}", line))
            }
        })
        .collect()
}

fn render_sensor_table(frame: &mut Frame, app: &App, sensors: Option<&AssetSensors>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some(group) = sensors.filter(|g| !g.sensors.is_empty()) else {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No sensors on this asset",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(block.title(" Sensors (0) "));
        frame.render_widget(empty, area);
        return;
    };

    let now = Instant::now();
    let header = Row::new(vec![
        Cell::from("Type"),
        Cell::from("Value"),
        Cell::from("Normal"),
        Cell::from("Trend"),
        Cell::from("Status"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = group
        .sensors
        .iter()
        .map(|reading| {
            let status_style = app.theme.status_style(reading.status);
            let value_style = if reading.status == HealthStatus::Healthy {
                Style::default()
            } else {
                status_style
            };
            let value = match (reading.value, app.board.get(&reading.key)) {
                (Some(_), Some(animated)) => Line::from(value_spans(
                    animated,
                    &reading.unit,
                    value_style,
                    app.directional_arrows,
                    now,
                )),
                (Some(v), None) => Line::from(format!("{:.1} {}", v, reading.unit)),
                (None, _) => Line::from(missing_span()),
            };
            let normal = app
                .thresholds
                .normal_band(&reading.kind)
                .map(|b| format!("{:.1}-{:.1}", b.low, b.high))
                .unwrap_or_else(|| "-".to_string());
            let levels = app.history.sparkline(&reading.key);
            let trend = sparkline_str(&levels[levels.len().saturating_sub(12)..]);

            Row::new(vec![
                Cell::from(reading.kind.label().to_string()),
                Cell::from(value),
                Cell::from(normal),
                Cell::from(trend),
                Cell::from(reading.status.symbol()).style(status_style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Fill(3),
        Constraint::Length(11),
        Constraint::Length(13),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(format!(" Sensors ({}) ", group.sensors.len())));
    frame.render_widget(table, area);
}
