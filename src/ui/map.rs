//! Network map rendering.
//!
//! Pipes are drawn as canvas lines over the reference street grid, nodes as
//! circles. Colours come from the current [`ViewMode`](crate::data::ViewMode);
//! isolated pipes and pipes with acknowledged incidents are dashed. The side
//! panel shows the legend, network stats and the current selection.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine},
        Block, Borders, Paragraph,
    },
    Frame,
};

use crate::app::{App, MapItem};
use crate::data::{Basemap, Polyline};
use crate::ui::theme::swatch_color;

/// Number of pieces a dashed pipe is cut into; every other piece is drawn.
const DASH_PIECES: usize = 12;

/// Width of the legend/stats panel.
const PANEL_WIDTH: u16 = 30;

/// Render the Map view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks =
        Layout::horizontal([Constraint::Min(20), Constraint::Length(PANEL_WIDTH)]).split(area);

    render_canvas(frame, app, chunks[0]);
    render_panel(frame, app, chunks[1]);
}

fn render_canvas(frame: &mut Frame, app: &App, area: Rect) {
    let bounds = app.layers.bounds().scaled(app.map_zoom);
    let selected = app.selected_map_item();
    let radius = (bounds.lon.1 - bounds.lon.0) * 0.012;
    let basemap = Basemap::get();
    let basemap_color = app.theme.basemap;

    let title = if app.network.is_none() {
        if app.load_error.is_some() {
            " Map (topology unavailable) ".to_string()
        } else {
            " Map (loading...) ".to_string()
        }
    } else {
        format!(" Map: {} ", app.view_mode.label())
    };

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds([bounds.lon.0, bounds.lon.1])
        .y_bounds([bounds.lat.0, bounds.lat.1])
        .paint(move |ctx| {
            if let Some(basemap) = basemap {
                for (from, to) in basemap.segments() {
                    ctx.draw(&CanvasLine {
                        x1: from.1,
                        y1: from.0,
                        x2: to.1,
                        y2: to.0,
                        color: basemap_color,
                    });
                }
                ctx.layer();
            }

            for line in app.layers.polylines() {
                let is_selected = selected == Some(MapItem::Pipe(line.edge_id.clone()));
                let color = if is_selected {
                    app.theme.highlight
                } else {
                    swatch_color(line.color)
                };
                draw_polyline(ctx, line, color);
            }
            ctx.layer();

            for marker in app.layers.markers() {
                ctx.draw(&Circle {
                    x: marker.lon,
                    y: marker.lat,
                    radius,
                    color: swatch_color(marker.color),
                });
                if selected == Some(MapItem::Node(marker.node_id.clone())) {
                    ctx.draw(&Circle {
                        x: marker.lon,
                        y: marker.lat,
                        radius: radius * 2.0,
                        color: app.theme.highlight,
                    });
                }
            }

            if app.map_labels {
                for marker in app.layers.markers() {
                    ctx.print(
                        marker.lon + radius * 1.5,
                        marker.lat,
                        Span::styled(marker.label.clone(), Style::default().fg(app.theme.border)),
                    );
                }
                for line in app.layers.polylines() {
                    let (lat, lon) = line.midpoint();
                    ctx.print(
                        lon,
                        lat,
                        Span::styled(
                            line.label.clone(),
                            Style::default()
                                .fg(swatch_color(line.color))
                                .add_modifier(Modifier::BOLD),
                        ),
                    );
                }
            }
        });

    frame.render_widget(canvas, area);
}

fn draw_polyline(ctx: &mut Context, line: &Polyline, color: ratatui::style::Color) {
    for ((lat1, lon1), (lat2, lon2)) in pieces(line) {
        ctx.draw(&CanvasLine {
            x1: lon1,
            y1: lat1,
            x2: lon2,
            y2: lat2,
            color,
        });
    }
}

/// Segments to draw for a polyline: the whole line, or alternating dashes.
fn pieces(line: &Polyline) -> Vec<((f64, f64), (f64, f64))> {
    if !line.dashed {
        return vec![(line.from, line.to)];
    }
    let at = |t: f64| {
        (
            line.from.0 + (line.to.0 - line.from.0) * t,
            line.from.1 + (line.to.1 - line.from.1) * t,
        )
    };
    (0..DASH_PIECES)
        .step_by(2)
        .map(|i| {
            let start = i as f64 / DASH_PIECES as f64;
            let end = (i + 1) as f64 / DASH_PIECES as f64;
            (at(start), at(end))
        })
        .collect()
}

fn render_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(app.view_mode.legend().len() as u16 + 4),
        Constraint::Length(7),
        Constraint::Min(3),
    ])
    .split(area);

    // Legend
    let mut legend: Vec<Line> = app
        .view_mode
        .legend()
        .iter()
        .map(|(label, swatch)| {
            Line::from(vec![
                Span::styled(" ━━ ", app.theme.swatch_style(*swatch, true)),
                Span::raw(*label),
            ])
        })
        .collect();
    legend.push(Line::from(vec![
        Span::styled(" ╌╌ ", Style::default().add_modifier(Modifier::DIM)),
        Span::raw("Isolated / acknowledged"),
    ]));
    legend.push(Line::from(Span::styled(
        " m:cycle view",
        Style::default().add_modifier(Modifier::DIM),
    )));
    frame.render_widget(
        Paragraph::new(legend).block(panel_block(app, " Legend ")),
        chunks[0],
    );

    // Stats
    let stats = app.network.as_ref().map(|n| n.stats()).unwrap_or_default();
    let stat_line = |label: &'static str, value: String, style: Style| {
        Line::from(vec![
            Span::raw(format!(" {:<18}", label)),
            Span::styled(value, style.add_modifier(Modifier::BOLD)),
        ])
    };
    let incident_style = if stats.active_incidents > 0 {
        Style::default().fg(app.theme.critical)
    } else {
        Style::default()
    };
    let stats_lines = vec![
        stat_line("Nodes", stats.nodes.to_string(), Style::default()),
        stat_line("Pipes", stats.pipes.to_string(), Style::default()),
        stat_line(
            "Active incidents",
            stats.active_incidents.to_string(),
            incident_style,
        ),
        stat_line(
            "Pipes affected",
            stats.pipes_affected.to_string(),
            incident_style,
        ),
        stat_line(
            "Isolated",
            app.isolation.isolated().len().to_string(),
            Style::default(),
        ),
    ];
    frame.render_widget(
        Paragraph::new(stats_lines).block(panel_block(app, " Network ")),
        chunks[1],
    );

    // Selection
    let selection = match (app.selected_map_item(), app.network.as_ref()) {
        (Some(MapItem::Node(id)), Some(network)) => network
            .node(&id)
            .map(crate::ui::detail::node_popup)
            .unwrap_or_default(),
        (Some(MapItem::Pipe(id)), Some(network)) => network
            .edge(&id)
            .map(|e| crate::ui::detail::edge_popup(e, app.view_mode, app.isolation.isolated()))
            .unwrap_or_default(),
        _ => vec!["Nothing selected".to_string()],
    };
    let selection_lines: Vec<Line> = selection
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            if i == 0 {
                Line::from(Span::styled(
                    format!(" {}", text),
                    Style::default().add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!(" {}", text))
            }
        })
        .chain(std::iter::once(Line::from(Span::styled(
            " Enter:detail ↑↓:select",
            Style::default().add_modifier(Modifier::DIM),
        ))))
        .collect();
    frame.render_widget(
        Paragraph::new(selection_lines).block(panel_block(app, " Selected ")),
        chunks[2],
    );
}

fn panel_block<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}
