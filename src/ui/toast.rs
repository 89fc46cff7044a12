//! Toast overlay, stacked in the top-right corner.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::toast::{Toast, ToastLevel};

const TOAST_WIDTH: u16 = 44;

fn level_color(app: &App, level: ToastLevel) -> Color {
    match level {
        ToastLevel::Info => app.theme.highlight,
        ToastLevel::Success => app.theme.healthy,
        ToastLevel::Error => app.theme.warning,
        ToastLevel::Alert => app.theme.critical,
    }
}

fn toast_height(toast: &Toast) -> u16 {
    if toast.description.is_some() {
        4
    } else {
        3
    }
}

/// Render live toasts, newest on top, below the header and tabs.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.toasts.is_empty() || area.width < TOAST_WIDTH + 2 {
        return;
    }

    let x = area.x + area.width - TOAST_WIDTH - 1;
    let mut y = area.y + 2;
    let bottom = area.y + area.height.saturating_sub(1);

    for toast in app.toasts.iter().rev() {
        let height = toast_height(toast);
        if y + height > bottom {
            break;
        }
        let rect = Rect::new(x, y, TOAST_WIDTH, height);
        let color = level_color(app, toast.level);

        let mut lines = vec![Line::from(Span::styled(
            toast.title.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))];
        if let Some(ref description) = toast.description {
            lines.push(Line::from(Span::styled(
                description.clone(),
                Style::default().add_modifier(Modifier::DIM),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(color)),
        );

        frame.render_widget(Clear, rect);
        frame.render_widget(paragraph, rect);
        y += height;
    }
}
