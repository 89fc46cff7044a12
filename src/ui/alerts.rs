use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::{AlertKind, HealthStatus};

/// Render the alert list, critical first.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.alerts.is_empty() {
        render_healthy_message(frame, app, area);
        return;
    }

    let alerts = app.visible_alerts();

    let critical_count = alerts
        .iter()
        .filter(|a| a.status == HealthStatus::Critical)
        .count();
    let warning_count = alerts
        .iter()
        .filter(|a| a.status == HealthStatus::Warning)
        .count();

    let header = Row::new(vec![
        Cell::from("Status"),
        Cell::from("Asset"),
        Cell::from("Kind"),
        Cell::from("Detail"),
        Cell::from("Normal"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = alerts
        .iter()
        .map(|alert| {
            let status_style = app.theme.status_style(alert.status);
            let normal = match &alert.kind {
                AlertKind::Reading { key, .. } => {
                    let kind = crate::data::SensorKind::parse(&key.kind);
                    app.thresholds
                        .normal_band(&kind)
                        .map(|b| format!("{:.1}-{:.1}", b.low, b.high))
                        .unwrap_or_else(|| "-".to_string())
                }
                _ => "-".to_string(),
            };

            Row::new(vec![
                Cell::from(alert.status.symbol()).style(status_style),
                Cell::from(alert.asset_name.clone())
                    .style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(alert.asset_kind.label())
                    .style(Style::default().add_modifier(Modifier::DIM)),
                Cell::from(alert.summary()).style(status_style),
                Cell::from(normal).style(Style::default().add_modifier(Modifier::DIM)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Fill(2),
        Constraint::Length(6),
        Constraint::Fill(3),
        Constraint::Length(11),
    ];

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let selected = app.selected_alert_index.min(alerts.len().saturating_sub(1));
    let position_info = if !alerts.is_empty() {
        format!(" [{}/{}]", selected + 1, alerts.len())
    } else {
        String::new()
    };

    let title = format!(
        " Alerts ({} crit, {} warn){}{} ",
        critical_count, warning_count, filter_info, position_info
    );

    let border_color = if critical_count > 0 {
        app.theme.critical
    } else if warning_count > 0 {
        app.theme.warning
    } else {
        app.theme.border
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(border_color)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_healthy_message(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Alerts ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.healthy));

    let detail = if app.sensors_loading() {
        "      Waiting for the first sensor reading."
    } else {
        "      All readings inside their normal bands; no pipes isolated."
    };

    let lines = vec![
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled("    ✓ ", Style::default().fg(app.theme.healthy)),
            Span::styled(
                "Network healthy",
                Style::default().fg(app.theme.healthy).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            detail,
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}
