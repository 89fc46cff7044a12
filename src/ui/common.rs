//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, help overlay
//! and the resize notice.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::data::duration::format_age;
use crate::data::HealthStatus;

/// Render the header bar with network overview.
///
/// Displays: status indicator, node and pipe counts, incidents, isolations.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref network) = app.network else {
        let status = if app.load_error.is_some() {
            "| Waiting for backend..."
        } else {
            "| Loading..."
        };
        let line = Line::from(vec![
            Span::styled(" TWINWATCH ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(status),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let stats = network.stats();
    let isolated = app.isolation.isolated().len();
    let health = app.overall_health();

    let count_span = |n: usize, status: HealthStatus| {
        if n > 0 {
            Span::styled(n.to_string(), app.theme.status_style(status))
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        }
    };

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.status_style(health)),
        Span::styled("TWINWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            stats.nodes.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" nodes "),
        Span::styled(
            stats.pipes.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" pipes │ "),
        count_span(stats.active_incidents as usize, HealthStatus::Warning),
        Span::raw(" incidents on "),
        count_span(stats.pipes_affected as usize, HealthStatus::Warning),
        Span::raw(" pipes │ "),
        count_span(isolated, HealthStatus::Critical),
        Span::raw(" isolated │ "),
        count_span(app.alerts.len(), health),
        Span::raw(" alerts"),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let alerts_title = if app.alerts.is_empty() {
        " 4:Alerts ".to_string()
    } else {
        format!(" 4:Alerts ({}) ", app.alerts.len())
    };
    let titles: Vec<Line> = vec![
        Line::from(" 1:Map "),
        Line::from(" 2:Pipes "),
        Line::from(" 3:Sensors "),
        Line::from(alerts_title),
    ];

    let selected = match app.current_view {
        View::Map => 0,
        View::Pipes => 1,
        View::Sensors => 2,
        View::Alerts => 3,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows: breadcrumb trail, source, time since last sensor update,
/// available controls. Also displays temporary status messages and errors.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some(ref err) = app.load_error {
        let paragraph = Paragraph::new(format!(
            " {} | Error: {} | r:retry q:quit",
            app.source_description(),
            err
        ))
        .style(Style::default().fg(app.theme.critical));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = if app.filter_active {
        "Type to search | Enter:apply Esc:cancel"
    } else {
        match app.current_view {
            View::Map => "m:mode ↑↓:select Enter:detail L:leak R:reset r:refresh ?:help q:quit",
            View::Pipes => "/:search s:sort S:reverse Enter:detail L:leak R:reset ?:help q:quit",
            View::Sensors => "/:search ↑↓:select Enter:detail r:refresh ?:help q:quit",
            View::Alerts => "/:search ↑↓:select Enter:detail R:reset ?:help q:quit",
        }
    };

    let updated = match app.last_sensor_update {
        Some(at) => format!("Updated {}", format_age(at.elapsed())),
        None => "Loading...".to_string(),
    };

    let realtime = match (app.realtime_description(), app.realtime_error()) {
        (Some(_), Some(err)) => format!(" | Feed: {}", err),
        (Some(desc), None) => format!(" | {}", desc),
        (None, _) => String::new(),
    };

    let status = format!(
        " {} | {}{} | {} | {}",
        app.breadcrumb(),
        app.source_description(),
        realtime,
        updated,
        controls,
    );

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  1-4 Tab     Switch views"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Enter       View detail"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" Network"),
        Line::from("  m         Cycle map colouring"),
        Line::from("  +/-       Zoom map"),
        Line::from("  r         Refresh sensors"),
        Line::from("  L         Simulate leak on pipe"),
        Line::from("  R         Reset pipe sensors"),
        Line::from(""),
        section(" Lists"),
        Line::from("  /         Start filter/search"),
        Line::from("  c         Clear filter/toasts"),
        Line::from("  s/S       Sort column/direction"),
        Line::from(""),
        section(" General"),
        Line::from("  e         Export to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 28u16.min(area.height.saturating_sub(2));
    let help_area = centered(area, help_width, help_height);

    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// Notice shown instead of the dashboard when the terminal is too small.
pub fn render_too_small(frame: &mut Frame, area: Rect, min_width: u16, min_height: u16) {
    let msg = format!(
        "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
        area.width, area.height, min_width, min_height
    );
    let paragraph = Paragraph::new(msg)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    let top = (area.height / 2).saturating_sub(2);
    let centered = Rect::new(0, top, area.width, 5.min(area.height));
    frame.render_widget(paragraph, centered);
}

/// A `width` x `height` rectangle centered in `area`.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered() {
        let r = centered(Rect::new(0, 0, 100, 40), 40, 10);
        assert_eq!(r, Rect::new(30, 15, 40, 10));

        let clipped = centered(Rect::new(0, 0, 20, 5), 40, 10);
        assert_eq!(clipped.width, 20);
        assert_eq!(clipped.height, 5);
    }
}
