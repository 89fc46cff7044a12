//! Light and dark themes.
//!
//! Health colours come from the same palette the map uses, so a critical
//! reading in a table matches a critical pipe on the canvas. Only the chrome
//! (accent, borders, street grid) differs between backgrounds.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::network::palette;
use crate::data::{HealthStatus, Swatch};

/// Colours and styles shared by every view.
///
/// Pick one with [`Theme::auto_detect()`], or [`Theme::dark()`] /
/// [`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent for the active tab, selections and status messages.
    pub highlight: Color,
    pub warning: Color,
    pub critical: Color,
    pub healthy: Color,
    pub border: Color,
    /// Table header rows.
    pub header: Style,
    /// Selected table row or card.
    pub selected: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub border_type: BorderType,
    /// Reference street grid under the map.
    pub basemap: Color,
}

impl Theme {
    fn with_chrome(accent: Color, border: Color, selected_bg: Color, basemap: Color) -> Self {
        let accented = Style::default().fg(accent).add_modifier(Modifier::BOLD);
        Self {
            highlight: accent,
            warning: swatch_color(palette::AMBER),
            critical: swatch_color(palette::RED),
            healthy: swatch_color(palette::GREEN),
            border,
            header: accented,
            selected: Style::default().bg(selected_bg).add_modifier(Modifier::BOLD),
            tab_active: accented,
            tab_inactive: Style::default().fg(border),
            border_type: BorderType::Rounded,
            basemap,
        }
    }

    /// For dark terminal backgrounds.
    pub fn dark() -> Self {
        Self::with_chrome(
            Color::Cyan,
            Color::Gray,
            Color::DarkGray,
            Color::Rgb(55, 65, 81),
        )
    }

    /// For light terminal backgrounds.
    pub fn light() -> Self {
        Self::with_chrome(
            Color::Blue,
            Color::DarkGray,
            Color::LightBlue,
            Color::Rgb(209, 213, 219),
        )
    }

    /// Pick light or dark from the terminal's background luminance.
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn status_color(&self, status: HealthStatus) -> Color {
        match status {
            HealthStatus::Healthy => self.healthy,
            HealthStatus::Warning => self.warning,
            HealthStatus::Critical => self.critical,
        }
    }

    /// Style for a health status; critical is bold.
    pub fn status_style(&self, status: HealthStatus) -> Style {
        let style = Style::default().fg(self.status_color(status));
        if status == HealthStatus::Critical {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    /// Style for a map colour, bold when `emphasised`.
    pub fn swatch_style(&self, swatch: Swatch, emphasised: bool) -> Style {
        let style = Style::default().fg(swatch_color(swatch));
        if emphasised {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }
}

/// Exact terminal colour for a map swatch.
pub fn swatch_color(swatch: Swatch) -> Color {
    let (r, g, b) = swatch.rgb();
    Color::Rgb(r, g, b)
}
