//! Sensor cards grouped by asset.
//!
//! One card per pipe or node, worst readings highlighted. Each value is an
//! animated display from the [`AnimationBoard`](crate::data::AnimationBoard),
//! followed by a sparkline of recent history and the time since the sensor
//! last reported.

use std::time::Instant;

use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_age;
use crate::data::history::sparkline_str;
use crate::data::{AssetSensors, HealthStatus, SensorReading};
use crate::ui::animated::{missing_span, value_spans};

/// Most recent readings shown in a card's sparkline.
const SPARKLINE_WIDTH: usize = 16;

/// Render the Sensors view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let now = Instant::now();

    if app.sensors_loading() || app.sensors.is_empty() {
        let text = if app.sensors_loading() {
            "Loading sensor data..."
        } else {
            "No sensor data available."
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            format!("  {}", text),
            Style::default().add_modifier(Modifier::DIM),
        )))
        .block(outer_block(app, " Sensors "));
        frame.render_widget(paragraph, area);
        return;
    }

    let groups = app.visible_sensor_groups();
    let alert_total: usize = groups.iter().map(|g| g.alert_count()).sum();
    let selected = app.selected_sensor_index.min(groups.len().saturating_sub(1));

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };
    let position_info = if !groups.is_empty() {
        format!(" [{}/{}]", selected + 1, groups.len())
    } else {
        String::new()
    };
    let title = format!(
        " Sensors ({} assets, {} alerts){}{} ",
        groups.len(),
        alert_total,
        filter_info,
        position_info
    );

    let block = outer_block(app, &title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let heights: Vec<u16> = groups.iter().map(|g| card_height(g)).collect();
    let first = first_visible(&heights, selected, inner.height);

    let mut y = inner.y;
    for (index, group) in groups.iter().enumerate().skip(first) {
        let bottom = inner.y + inner.height;
        if y >= bottom {
            break;
        }
        let height = heights[index].min(bottom - y);
        let card = Rect::new(inner.x, y, inner.width, height);
        render_card(frame, app, group, index == selected, card, now);
        y += height;
    }
}

fn outer_block<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

fn card_height(group: &AssetSensors) -> u16 {
    group.sensors.len().max(1) as u16 + 2
}

/// Index of the first card to draw so that `selected` fits in `available` rows.
fn first_visible(heights: &[u16], selected: usize, available: u16) -> usize {
    let mut first = selected.min(heights.len().saturating_sub(1));
    let mut used = heights.get(first).copied().unwrap_or(0);
    while first > 0 {
        let above = heights[first - 1];
        if used + above > available {
            break;
        }
        used += above;
        first -= 1;
    }
    first
}

fn render_card(
    frame: &mut Frame,
    app: &App,
    group: &AssetSensors,
    selected: bool,
    area: Rect,
    now: Instant,
) {
    let health = group.health();
    let border_style = if selected {
        Style::default()
            .fg(app.theme.highlight)
            .add_modifier(Modifier::BOLD)
    } else if health == HealthStatus::Healthy {
        Style::default().fg(app.theme.border)
    } else {
        app.theme.status_style(health)
    };

    let title = Line::from(vec![
        Span::raw(if selected { " ▶ " } else { " " }),
        Span::styled(
            group.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" · {} ", group.asset_kind.label()),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    let lines: Vec<Line> = if group.sensors.is_empty() {
        vec![Line::from(Span::styled(
            "  No readings",
            Style::default().add_modifier(Modifier::DIM),
        ))]
    } else {
        group
            .sensors
            .iter()
            .map(|reading| reading_line(app, reading, now))
            .collect()
    };

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(border_style),
    );
    frame.render_widget(paragraph, area);
}

fn reading_line(app: &App, reading: &SensorReading, now: Instant) -> Line<'static> {
    let value_style = match reading.status {
        HealthStatus::Healthy => Style::default(),
        status => app.theme.status_style(status),
    };

    let mut spans = vec![Span::styled(
        format!(" {:<10}", reading.kind.label()),
        Style::default().add_modifier(Modifier::DIM),
    )];

    if reading.status == HealthStatus::Critical {
        spans.push(Span::styled(
            " Alert ",
            Style::default()
                .fg(Color::White)
                .bg(app.theme.critical)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
    }

    match (reading.value, app.board.get(&reading.key)) {
        (Some(_), Some(animated)) => spans.extend(value_spans(
            animated,
            &reading.unit,
            value_style,
            app.directional_arrows,
            now,
        )),
        // Not mounted yet: show the raw value without a transition
        (Some(value), None) => {
            spans.push(Span::styled(
                crate::data::format_reading(value),
                value_style.add_modifier(Modifier::BOLD),
            ));
            if !reading.unit.is_empty() {
                spans.push(Span::raw(format!(" {}", reading.unit)));
            }
        }
        (None, _) => spans.push(missing_span()),
    }

    let levels = app.history.sparkline(&reading.key);
    let sparkline = sparkline_str(&levels[levels.len().saturating_sub(SPARKLINE_WIDTH)..]);
    if !sparkline.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(sparkline, Style::default().fg(app.theme.highlight)));
    }

    if let Some(seen) = reading.last_seen {
        if let Ok(age) = (Utc::now() - seen).to_std() {
            spans.push(Span::styled(
                format!("  {}", format_age(age)),
                Style::default().add_modifier(Modifier::DIM),
            ));
        }
    }

    Line::from(spans)
}
