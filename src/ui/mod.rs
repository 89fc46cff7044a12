//! Terminal UI rendering using ratatui.
//!
//! This module contains all the view-specific rendering logic for the TUI.
//! Each view is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`map`]: Canvas map of nodes and pipes with legend and network stats
//! - [`pipes`]: Sortable table of every pipe
//! - [`sensors`]: Sensor cards grouped by asset, with animated readings
//! - [`alerts`]: Unhealthy readings and troubled pipes, critical first
//! - [`detail`]: Modal overlay describing the selected node or pipe
//! - [`animated`]: Spans for an animated reading
//! - [`toast`]: Transient notifications
//! - [`common`]: Shared components (header, tabs, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! The main loop in `main.rs` calls into these modules based on the current view:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ Tabs (common::render_tabs)           │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ View Content                         │
//! │ (map/pipes/sensors/alerts::render)   │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - detail::render_overlay
//!    - common::render_help
//!    - toast::render
//! ```

pub mod alerts;
pub mod animated;
pub mod common;
pub mod detail;
pub mod map;
pub mod pipes;
pub mod sensors;
pub mod theme;
pub mod toast;

pub use pipes::PipeSortColumn;
pub use theme::Theme;
