//! Layered configuration.
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! file (`--config`, or `twinwatch.toml` in the working directory if it
//! exists), `TWINWATCH_*` environment variables, and finally CLI flags
//! applied by the binary.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! timeout = "10s"
//!
//! [realtime]
//! address = "localhost:4000"
//!
//! [polling]
//! topology = "30s"
//! sensors = "5s"
//!
//! [thresholds]
//! pressure_alert_below = 55.0
//!
//! [animation]
//! hold = "2s"
//! collapse = "1s"
//!
//! [map]
//! view_mode = "material"
//!
//! [logging]
//! file = "twinwatch.log"
//! level = "info"
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `TWINWATCH_API__BASE_URL` or `TWINWATCH_POLLING__SENSORS=2s`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::duration::parse_duration;
use crate::data::{AnimationTiming, Thresholds, ViewMode};
use crate::source::PollIntervals;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "twinwatch.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TWINWATCH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: Option<String>,
    pub timeout: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: "10s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// `host:port` of the change feed.
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub topology: String,
    pub sensors: String,
    /// How often a snapshot file is checked for changes.
    pub file: String,
    /// Tick of the demo network.
    pub demo: String,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            topology: "30s".to_string(),
            sensors: "5s".to_string(),
            file: "1s".to_string(),
            demo: "2s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub hold: String,
    pub collapse: String,
    /// Show ↑/↓ instead of a neutral arrow.
    pub directional_arrows: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            hold: "2s".to_string(),
            collapse: "1s".to_string(),
            directional_arrows: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub view_mode: String,
    /// JSON file of reference streets.
    pub basemap: Option<PathBuf>,
    /// Draw node and pipe names on the map.
    pub labels: bool,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            view_mode: "status".to_string(),
            basemap: None,
            labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log file; the terminal belongs to the dashboard.
    pub file: Option<PathBuf>,
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

/// All dashboard settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub realtime: RealtimeSettings,
    pub polling: PollingSettings,
    pub thresholds: Thresholds,
    pub animation: AnimationSettings,
    pub map: MapSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from `path` (or the default file if present) and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("loading configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn poll_intervals(&self) -> Result<PollIntervals> {
        Ok(PollIntervals {
            topology: interval_setting("polling.topology", &self.polling.topology)?,
            sensors: interval_setting("polling.sensors", &self.polling.sensors)?,
        })
    }

    pub fn file_interval(&self) -> Result<Duration> {
        interval_setting("polling.file", &self.polling.file)
    }

    pub fn demo_interval(&self) -> Result<Duration> {
        interval_setting("polling.demo", &self.polling.demo)
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        duration_setting("api.timeout", &self.api.timeout)
    }

    pub fn animation_timing(&self) -> Result<AnimationTiming> {
        Ok(AnimationTiming {
            hold: duration_setting("animation.hold", &self.animation.hold)?,
            collapse: duration_setting("animation.collapse", &self.animation.collapse)?,
        })
    }

    pub fn view_mode(&self) -> Result<ViewMode> {
        ViewMode::parse(&self.map.view_mode).with_context(|| {
            format!(
                "map.view_mode: expected status, material or age, got {:?}",
                self.map.view_mode
            )
        })
    }
}

fn duration_setting(key: &str, value: &str) -> Result<Duration> {
    parse_duration(value).with_context(|| format!("{}: invalid duration {:?}", key, value))
}

/// A polling period; zero would spin the poller.
fn interval_setting(key: &str, value: &str) -> Result<Duration> {
    let interval = duration_setting(key, value)?;
    if interval.is_zero() {
        anyhow::bail!("{}: interval must be greater than zero, got {:?}", key, value);
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.poll_intervals().unwrap(), PollIntervals::default());
        assert_eq!(settings.animation_timing().unwrap(), AnimationTiming::default());
        assert_eq!(settings.view_mode().unwrap(), ViewMode::Status);
        assert_eq!(settings.api_timeout().unwrap(), Duration::from_secs(10));
        assert_eq!(settings.demo_interval().unwrap(), Duration::from_secs(2));
        assert!(settings.animation.directional_arrows);
    }

    #[test]
    fn test_load_file() {
        let file = toml_file(
            r#"
            [api]
            base_url = "http://twin.local:8000"

            [polling]
            sensors = "2s"

            [thresholds]
            pressure_alert_below = 50.0

            [animation]
            hold = "1500ms"

            [map]
            view_mode = "age"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.api.base_url.as_deref(), Some("http://twin.local:8000"));
        assert_eq!(settings.poll_intervals().unwrap().sensors, Duration::from_secs(2));
        assert_eq!(settings.poll_intervals().unwrap().topology, Duration::from_secs(30));
        assert_eq!(settings.thresholds.pressure_alert_below, 50.0);
        assert_eq!(settings.thresholds.flow_alert_above, 110.0);
        assert_eq!(
            settings.animation_timing().unwrap().hold,
            Duration::from_millis(1500)
        );
        assert_eq!(settings.view_mode().unwrap(), ViewMode::Age);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        assert!(Settings::load(Some(Path::new("/nonexistent/twinwatch.toml"))).is_err());
    }

    #[test]
    fn test_invalid_values_reported() {
        let mut settings = Settings::default();
        settings.polling.sensors = "often".into();
        let err = settings.poll_intervals().unwrap_err();
        assert!(format!("{:#}", err).contains("polling.sensors"));

        settings.map.view_mode = "satellite".into();
        assert!(settings.view_mode().is_err());
    }

    #[test]
    fn test_zero_polling_interval_rejected() {
        let mut settings = Settings::default();
        settings.polling.topology = "0s".into();
        let err = settings.poll_intervals().unwrap_err();
        assert!(format!("{:#}", err).contains("polling.topology"));

        settings.polling.topology = "30s".into();
        settings.polling.sensors = "0ms".into();
        assert!(settings.poll_intervals().is_err());

        settings.polling.demo = "0s".into();
        assert!(settings.demo_interval().is_err());

        // Animation durations may be zero
        settings.animation.collapse = "0s".into();
        assert!(settings.animation_timing().is_ok());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("[realtime]\naddress = \"file:1\"\n");
        std::env::set_var("TWINWATCH_REALTIME__ADDRESS", "env:2");
        let settings = Settings::load(Some(file.path()));
        std::env::remove_var("TWINWATCH_REALTIME__ADDRESS");

        assert_eq!(settings.unwrap().realtime.address.as_deref(), Some("env:2"));
    }
}
