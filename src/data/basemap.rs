//! Reference street polylines drawn beneath the network.
//!
//! The basemap is a process-wide resource: the first caller loads it and
//! every later caller gets the same instance, whatever path they pass.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use super::map::DEFAULT_CENTER;

static BASEMAP: OnceLock<Basemap> = OnceLock::new();
static LOADS: AtomicUsize = AtomicUsize::new(0);

/// One street as a list of `[latitude, longitude]` points.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Street {
    #[serde(default)]
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Basemap {
    #[serde(default)]
    pub streets: Vec<Street>,
}

impl Basemap {
    /// The shared basemap, loading it on first use.
    ///
    /// A missing or invalid file falls back to a small built-in street grid
    /// around the default centre.
    pub fn get_or_load(path: Option<&Path>) -> &'static Basemap {
        BASEMAP.get_or_init(|| {
            LOADS.fetch_add(1, Ordering::SeqCst);
            match path {
                Some(path) => match Self::from_file(path) {
                    Ok(map) => {
                        info!(path = %path.display(), streets = map.streets.len(), "basemap loaded");
                        map
                    }
                    Err(e) => {
                        warn!(error = %e, "basemap unavailable, using built-in grid");
                        Self::grid(DEFAULT_CENTER)
                    }
                },
                None => Self::grid(DEFAULT_CENTER),
            }
        })
    }

    /// The shared basemap if something already loaded it.
    pub fn get() -> Option<&'static Basemap> {
        BASEMAP.get()
    }

    /// How many times initialisation ran in this process.
    pub fn load_count() -> usize {
        LOADS.load(Ordering::SeqCst)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading basemap {}", path.display()))?;
        let map: Basemap = serde_json::from_str(&content)
            .with_context(|| format!("parsing basemap {}", path.display()))?;
        Ok(map)
    }

    /// A 5x5 street grid spaced 0.004 degrees around `center`.
    pub fn grid(center: (f64, f64)) -> Self {
        let step = 0.004;
        let half = 2.0 * step;
        let mut streets = Vec::new();
        for i in -2..=2 {
            let offset = i as f64 * step;
            streets.push(Street {
                name: format!("St {}", i + 3),
                points: vec![
                    (center.0 + offset, center.1 - half),
                    (center.0 + offset, center.1 + half),
                ],
            });
            streets.push(Street {
                name: format!("Ave {}", i + 3),
                points: vec![
                    (center.0 - half, center.1 + offset),
                    (center.0 + half, center.1 + offset),
                ],
            });
        }
        Self { streets }
    }

    /// Consecutive point pairs of every street.
    pub fn segments(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.streets
            .iter()
            .flat_map(|s| s.points.windows(2).map(|w| (w[0], w[1])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_loads_once() {
        let first = Basemap::get_or_load(None);
        let second = Basemap::get_or_load(Some(Path::new("/does/not/matter.json")));
        assert!(std::ptr::eq(first, second));
        assert!(std::ptr::eq(first, Basemap::get().unwrap()));
        assert_eq!(Basemap::load_count(), 1);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"streets": [{{"name": "First", "points": [[37.0, -121.0], [37.1, -121.0], [37.1, -121.1]]}}]}}"#
        )
        .unwrap();
        let map = Basemap::from_file(file.path()).unwrap();
        assert_eq!(map.streets[0].name, "First");
        assert_eq!(map.segments().count(), 2);
    }

    #[test]
    fn test_from_file_errors() {
        assert!(Basemap::from_file(Path::new("/nonexistent/basemap.json")).is_err());
    }

    #[test]
    fn test_grid() {
        let grid = Basemap::grid(DEFAULT_CENTER);
        assert_eq!(grid.streets.len(), 10);
        assert_eq!(grid.segments().count(), 10);
    }
}
