//! Pipes view rendering.
//!
//! Displays a table of every pipe with status, material, age, incident
//! count and derived health.

use std::collections::BTreeSet;

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::network::{edge_color, edge_health, installation_year};
use crate::source::EdgeRecord;
use crate::ui::theme::swatch_color;

/// Column to sort by in the Pipes view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipeSortColumn {
    /// Sort by pipe name alphabetically.
    #[default]
    Name,
    /// Sort by derived health.
    Health,
    /// Sort by material name.
    Material,
    /// Sort by installation year (missing years first).
    Installed,
    /// Sort by active incident count.
    Incidents,
}

impl PipeSortColumn {
    /// Cycle to the next sort column.
    pub fn next(self) -> Self {
        match self {
            PipeSortColumn::Name => PipeSortColumn::Health,
            PipeSortColumn::Health => PipeSortColumn::Material,
            PipeSortColumn::Material => PipeSortColumn::Installed,
            PipeSortColumn::Installed => PipeSortColumn::Incidents,
            PipeSortColumn::Incidents => PipeSortColumn::Name,
        }
    }

    fn label(self) -> &'static str {
        match self {
            PipeSortColumn::Name => "name",
            PipeSortColumn::Health => "health",
            PipeSortColumn::Material => "material",
            PipeSortColumn::Installed => "installed",
            PipeSortColumn::Incidents => "incidents",
        }
    }
}

/// Render the Pipes view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref network) = app.network else {
        let message = if app.load_error.is_some() {
            " Topology unavailable. Retrying... "
        } else {
            " Loading network... "
        };
        let block = Block::default()
            .title(message)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border));
        frame.render_widget(block, area);
        return;
    };

    let isolated = app.isolation.isolated();
    let pipes = app.visible_pipes();

    let header = Row::new(vec![
        Cell::from(format_header("Pipe", PipeSortColumn::Name, app)),
        Cell::from("Status"),
        Cell::from(format_header("Material", PipeSortColumn::Material, app)),
        Cell::from(format_header("Installed", PipeSortColumn::Installed, app)),
        Cell::from(format_header("Incidents", PipeSortColumn::Incidents, app)),
        Cell::from("Map"),
        Cell::from(format_header("Health", PipeSortColumn::Health, app)),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = pipes
        .iter()
        .map(|edge| {
            let health = edge_health(edge, isolated);
            let status_style = app.theme.status_style(health);
            let swatch = edge_color(edge, app.view_mode, isolated);
            let line = if crate::data::network::is_dashed(edge, isolated) {
                "╌╌╌"
            } else {
                "───"
            };
            let incidents = match edge.active_incident_count {
                Some(n) if n > 0 => n.to_string(),
                _ => "-".to_string(),
            };

            Row::new(vec![
                Cell::from(edge.name.clone()),
                Cell::from(display_status(edge, isolated)).style(status_style),
                Cell::from(edge.material.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(
                    installation_year(edge)
                        .map(|y| y.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::from(incidents),
                Cell::from(line).style(Style::default().fg(swatch_color(swatch))),
                Cell::from(health.symbol()).style(status_style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Min(4),
        Constraint::Min(6),
    ];

    let selected = app.selected_pipe_index.min(pipes.len().saturating_sub(1));
    let sort_dir = if app.pipe_sort_ascending { "↑" } else { "↓" };

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let position_info = if !pipes.is_empty() {
        format!(" [{}/{}]", selected + 1, pipes.len())
    } else {
        String::new()
    };

    let title = format!(
        " Pipes ({}/{}) [s:sort {}{}]{}{} ",
        pipes.len(),
        network.edges.len(),
        app.pipe_sort_column.label(),
        sort_dir,
        filter_info,
        position_info
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}

/// Status text, with isolations from the change feed taking precedence.
fn display_status(edge: &EdgeRecord, isolated: &BTreeSet<String>) -> String {
    if isolated.contains(&edge.id) {
        return "isolated".to_string();
    }
    if edge.status.is_empty() {
        "-".to_string()
    } else {
        edge.status.clone()
    }
}

fn format_header(name: &str, col: PipeSortColumn, app: &App) -> Span<'static> {
    if app.pipe_sort_column == col {
        let arrow = if app.pipe_sort_ascending { "↑" } else { "↓" };
        Span::raw(format!("{}{}", name, arrow))
    } else {
        Span::raw(name.to_string())
    }
}

/// Sort pipes by the given column and direction.
pub fn sort_pipes_by(
    pipes: &mut [&EdgeRecord],
    column: PipeSortColumn,
    ascending: bool,
    isolated: &BTreeSet<String>,
) {
    pipes.sort_by(|a, b| {
        let primary = match column {
            PipeSortColumn::Name => a.name.cmp(&b.name),
            PipeSortColumn::Health => edge_health(a, isolated).cmp(&edge_health(b, isolated)),
            PipeSortColumn::Material => a.material.cmp(&b.material),
            PipeSortColumn::Installed => installation_year(a).cmp(&installation_year(b)),
            PipeSortColumn::Incidents => a
                .active_incident_count
                .unwrap_or(0)
                .cmp(&b.active_incident_count.unwrap_or(0)),
        };

        let primary = if ascending {
            primary
        } else {
            primary.reverse()
        };

        // Secondary sort by name, then id, for stability
        primary
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: &str, name: &str, year: Option<&str>, incidents: Option<u32>) -> EdgeRecord {
        EdgeRecord {
            id: id.into(),
            name: name.into(),
            status: "normal".into(),
            from_node_id: "a".into(),
            to_node_id: "b".into(),
            active_incident_count: incidents,
            has_open_incidents: incidents.unwrap_or(0) > 0,
            has_acknowledged_incidents: false,
            material: None,
            installation_date: year.map(String::from),
        }
    }

    #[test]
    fn test_sort_by_installed_and_direction() {
        let a = edge("1", "A", Some("2015-01-01"), None);
        let b = edge("2", "B", Some("1978-06-01"), None);
        let c = edge("3", "C", None, None);
        let mut pipes = vec![&a, &b, &c];

        sort_pipes_by(&mut pipes, PipeSortColumn::Installed, true, &BTreeSet::new());
        let names: Vec<&str> = pipes.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["C", "B", "A"]);

        sort_pipes_by(&mut pipes, PipeSortColumn::Installed, false, &BTreeSet::new());
        assert_eq!(pipes[0].name, "A");
    }

    #[test]
    fn test_sort_by_health_counts_isolation() {
        let a = edge("1", "A", None, None);
        let b = edge("2", "B", None, Some(2));
        let c = edge("3", "C", None, None);
        let mut pipes = vec![&a, &b, &c];
        let isolated: BTreeSet<String> = ["3".to_string()].into_iter().collect();

        // Open incidents and isolation are both critical; ties fall back to name
        sort_pipes_by(&mut pipes, PipeSortColumn::Health, false, &isolated);
        let names: Vec<&str> = pipes.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["B", "C", "A"]);
    }

    #[test]
    fn test_display_status_prefers_isolation() {
        let a = edge("1", "A", None, None);
        let isolated: BTreeSet<String> = ["1".to_string()].into_iter().collect();
        assert_eq!(display_status(&a, &isolated), "isolated");
        assert_eq!(display_status(&a, &BTreeSet::new()), "normal");
    }

    #[test]
    fn test_sort_column_cycle() {
        let mut col = PipeSortColumn::default();
        for _ in 0..5 {
            col = col.next();
        }
        assert_eq!(col, PipeSortColumn::Name);
    }
}
