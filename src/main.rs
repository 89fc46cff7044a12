// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tokio::runtime::Runtime;
use tracing::{info, warn};

mod api;
mod app;
mod data;
mod events;
mod logging;
mod realtime;
mod settings;
mod source;
mod toast;
mod ui;

use api::{ActionSink, ApiClient, HttpActions, NoActions};
use app::{App, AppOptions, View};
use data::duration::format_interval;
use data::Basemap;
use realtime::Subscription;
use settings::Settings;
use source::{DataSource, DemoActions, DemoNetwork, DemoSource, FileSource, HttpSource};

/// Minimum terminal size for usable display.
const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 12;

/// How often streaming sources are drained.
const STREAM_REFRESH: Duration = Duration::from_millis(100);

/// How long `--export` waits for the first topology and sensor readings.
const EXPORT_WAIT: Duration = Duration::from_secs(15);

#[derive(Parser, Debug)]
#[command(name = "twinwatch")]
#[command(about = "Terminal dashboard for a water-distribution network digital twin")]
struct Args {
    /// Backend API base URL (e.g. http://localhost:8000)
    #[arg(short, long, conflicts_with_all = ["file", "demo"])]
    api: Option<String>,

    /// Replay a JSON snapshot file instead of polling the backend
    #[arg(short, long, conflicts_with_all = ["api", "demo"])]
    file: Option<PathBuf>,

    /// Run against a simulated in-process network
    #[arg(long, conflicts_with_all = ["api", "file"])]
    demo: bool,

    /// Change feed to listen on for pipe isolations (host:port)
    #[arg(long)]
    realtime: Option<String>,

    /// Configuration file (defaults to twinwatch.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Pressure (psi) below which a reading alerts
    #[arg(long)]
    pressure_alert_below: Option<f64>,

    /// Acoustic level (dB) above which a reading alerts
    #[arg(long)]
    acoustic_alert_above: Option<f64>,

    /// Flow (L/s) above which a reading alerts
    #[arg(long)]
    flow_alert_above: Option<f64>,

    /// Initial map colouring: status, material or age
    #[arg(long)]
    view_mode: Option<String>,

    /// Export current state to JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

/// Where snapshots come from.
enum SourceChoice {
    Api(String),
    File(PathBuf),
    Demo,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    apply_overrides(&mut settings, &args);

    logging::init(settings.logging.file.as_deref(), &settings.logging.level)?;
    Basemap::get_or_load(settings.map.basemap.as_deref());

    let options = AppOptions {
        thresholds: settings.thresholds.clone(),
        timing: settings.animation_timing()?,
        view_mode: settings.view_mode()?,
        directional_arrows: settings.animation.directional_arrows,
        map_labels: settings.map.labels,
        ..AppOptions::default()
    };

    // Explicit flags win; otherwise a configured backend, otherwise the demo
    let choice = if let Some(ref path) = args.file {
        SourceChoice::File(path.clone())
    } else if args.demo {
        SourceChoice::Demo
    } else if let Some(ref url) = settings.api.base_url {
        SourceChoice::Api(url.clone())
    } else {
        SourceChoice::Demo
    };

    let rt = Runtime::new()?;
    let (source, actions, feed, refresh) = match choice {
        SourceChoice::Api(ref url) => build_api(&rt, &settings, url)?,
        SourceChoice::File(ref path) => {
            let refresh = settings.file_interval()?;
            let source: Box<dyn DataSource> = Box::new(FileSource::new(path));
            let feed = connect_feed(&rt, settings.realtime.address.as_deref());
            (source, Box::new(NoActions::default()) as Box<dyn ActionSink>, feed, refresh)
        }
        SourceChoice::Demo => build_demo(&settings)?,
    };

    info!(
        source = source.description(),
        refresh = %format_interval(refresh),
        "starting"
    );

    let mut app = App::new(source, actions, options.clone());
    if let Some(feed) = feed {
        app = app.with_realtime(feed);
    }

    // Handle export mode (non-interactive)
    if let Some(export_path) = args.export {
        let result = export_once(&mut app, &export_path);
        app.teardown();
        return result;
    }

    let result = run_tui(&mut app, refresh);

    // Background fetchers and the feed die with the runtime
    drop(app);
    rt.shutdown_timeout(Duration::from_secs(1));
    result
}

/// CLI flags override file and environment settings.
fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(ref url) = args.api {
        settings.api.base_url = Some(url.clone());
    }
    if let Some(ref addr) = args.realtime {
        settings.realtime.address = Some(addr.clone());
    }
    if let Some(ref path) = args.log_file {
        settings.logging.file = Some(path.clone());
    }
    if let Some(ref mode) = args.view_mode {
        settings.map.view_mode = mode.clone();
    }
    if let Some(v) = args.pressure_alert_below {
        settings.thresholds.pressure_alert_below = v;
    }
    if let Some(v) = args.acoustic_alert_above {
        settings.thresholds.acoustic_alert_above = v;
    }
    if let Some(v) = args.flow_alert_above {
        settings.thresholds.flow_alert_above = v;
    }
}

type Wiring = (
    Box<dyn DataSource>,
    Box<dyn ActionSink>,
    Option<Subscription>,
    Duration,
);

/// Poll the backend API in the background and send actions to it.
fn build_api(rt: &Runtime, settings: &Settings, url: &str) -> Result<Wiring> {
    let client = ApiClient::with_timeout(url, settings.api_timeout()?)
        .with_context(|| format!("invalid API URL {:?}", url))?;
    let intervals = settings.poll_intervals()?;
    info!(
        %url,
        topology = %format_interval(intervals.topology),
        sensors = %format_interval(intervals.sensors),
        "polling backend"
    );

    let source = HttpSource::spawn(client.clone(), intervals, rt.handle());
    let actions = HttpActions::new(client, rt.handle().clone());
    let feed = connect_feed(rt, settings.realtime.address.as_deref());

    Ok((Box::new(source), Box::new(actions), feed, STREAM_REFRESH))
}

/// Simulated network with its own change feed.
fn build_demo(settings: &Settings) -> Result<Wiring> {
    let network = DemoNetwork::new().shared();
    let feed = network
        .lock()
        .map_err(|_| anyhow!("demo network unavailable"))?
        .subscribe();

    let source = DemoSource::new(network.clone(), settings.demo_interval()?);
    let actions = DemoActions::new(network);

    Ok((Box::new(source), Box::new(actions), Some(feed), STREAM_REFRESH))
}

/// Connect to the change feed if one is configured.
///
/// The dashboard still works without isolation notifications, so a failed
/// connection is logged rather than fatal.
fn connect_feed(rt: &Runtime, address: Option<&str>) -> Option<Subscription> {
    let addr = address?;
    match rt.block_on(realtime::subscribe_tcp(addr)) {
        Ok(feed) => Some(feed),
        Err(e) => {
            warn!(%addr, error = %e, "change feed unavailable");
            eprintln!("Change feed {} unavailable: {}", addr, e);
            None
        }
    }
}

/// Run the TUI against an already wired app.
fn run_tui(app: &mut App, refresh_interval: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    // Load initial data
    let _ = app.reload_data();

    // Run the main loop
    let result = run_app(&mut terminal, app, refresh_interval);
    app.teardown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    while app.running {
        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                ui::common::render_too_small(frame, area, MIN_WIDTH, MIN_HEIGHT);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Map => ui::map::render(frame, app, chunks[2]),
                View::Pipes => ui::pipes::render(frame, app, chunks[2]),
                View::Sensors => ui::sensors::render(frame, app, chunks[2]),
                View::Alerts => ui::alerts::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_detail_overlay {
                ui::detail::render_overlay(frame, app, area);
            }

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }

            ui::toast::render(frame, app, area);
        })?;

        // Wake up early when an animation phase ends
        let mut timeout = Duration::from_millis(100);
        if let Some(deadline) = app.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
        }

        if let Some(event) = events::poll_event(timeout)? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    // Content starts after header (1) + tabs (1)
                    events::handle_mouse_event(app, mouse, 2);
                }
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }

        app.update(Instant::now());

        // Auto-refresh data periodically, or right away when asked to
        if app.take_refresh_request() || last_refresh.elapsed() >= refresh_interval {
            let _ = app.reload_data();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}

/// Wait for the first topology and sensor readings, then export them.
fn export_once(app: &mut App, export_path: &Path) -> Result<()> {
    let started = Instant::now();
    loop {
        app.reload_data()?;
        if app.network.is_some() && app.sensor_rows.is_some() {
            break;
        }
        if started.elapsed() >= EXPORT_WAIT {
            if let Some(err) = app.load_error.as_ref() {
                return Err(anyhow!("no data from {}: {}", app.source_description(), err));
            }
            // Export whatever arrived
            break;
        }
        std::thread::sleep(STREAM_REFRESH);
    }

    app.export_state(export_path)?;
    println!("Exported twin state to: {}", export_path.display());
    Ok(())
}
