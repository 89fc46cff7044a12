//! Spans for an animated reading.
//!
//! The new value is bold; while a prior value is on screen it is drawn
//! struck through and dimmed, followed by an arrow. During the collapse the
//! prior text loses characters from the right until it is gone.

use std::time::Instant;

use ratatui::style::{Modifier, Style};
use ratatui::text::Span;

use crate::data::{format_reading, AnimatedValue, Direction, Phase};

/// Arrow between the prior and displayed value.
pub fn arrow(direction: Option<Direction>, directional: bool) -> &'static str {
    match (directional, direction) {
        (true, Some(Direction::Up)) => "↑",
        (true, Some(Direction::Down)) => "↓",
        _ => "→",
    }
}

/// Prior-value text shortened by how far the collapse has progressed.
fn collapsed(text: &str, progress: f64) -> String {
    let len = text.chars().count();
    let keep = ((1.0 - progress) * len as f64).ceil() as usize;
    text.chars().take(keep.min(len)).collect()
}

/// Spans for one reading: `[prior] [arrow] displayed [unit]`.
pub fn value_spans(
    value: &AnimatedValue,
    unit: &str,
    style: Style,
    directional: bool,
    now: Instant,
) -> Vec<Span<'static>> {
    let mut spans = Vec::with_capacity(4);

    if let Some(prior) = value.prior() {
        let progress = if value.phase() == Phase::Collapsing {
            value.collapse_progress(now)
        } else {
            0.0
        };
        let text = collapsed(&format_reading(prior), progress);
        if !text.is_empty() {
            spans.push(Span::styled(
                text,
                Style::default().add_modifier(Modifier::CROSSED_OUT | Modifier::DIM),
            ));
            spans.push(Span::styled(
                format!(" {} ", arrow(value.direction(), directional)),
                Style::default().add_modifier(Modifier::DIM),
            ));
        }
    }

    spans.push(Span::styled(
        format_reading(value.displayed()),
        style.add_modifier(Modifier::BOLD),
    ));
    if !unit.is_empty() {
        spans.push(Span::raw(format!(" {}", unit)));
    }
    spans
}

/// Placeholder for a reading with no value.
pub fn missing_span() -> Span<'static> {
    Span::styled("-", Style::default().add_modifier(Modifier::DIM))
}
