//! File-based data source.
//!
//! Replays a captured twin state from disk. Two shapes are accepted:
//!
//! - a snapshot, `{"topology": {...}, "sensors": [...]}`, either half optional
//! - a bare topology response, `{"nodes": [...], "edges": [...]}`, as saved
//!   from the backend's topology endpoint
//!
//! The file is re-read whenever its modification time advances.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, warn};

use super::{DataSource, Topology, TwinSnapshot};

/// Reads twin snapshots from a JSON file.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    /// Modification time of the last successfully parsed contents.
    loaded_at: Option<SystemTime>,
    force_reload: bool,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            loaded_at: None,
            force_reload: false,
        }
    }

    /// Returns the path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    fn is_stale(&self, modified: Option<SystemTime>) -> bool {
        if self.force_reload {
            return true;
        }
        match (self.loaded_at, modified) {
            (None, _) => true,
            // A vanished file keeps the last state on screen
            (Some(_), None) => false,
            (Some(loaded), Some(current)) => current > loaded,
        }
    }

    fn load(&mut self) -> Option<TwinSnapshot> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                return None;
            }
        };

        match parse_snapshot(&content) {
            Ok(snapshot) => {
                debug!(
                    path = %self.path.display(),
                    topology = snapshot.topology.is_some(),
                    sensors = snapshot.sensors.as_ref().map_or(0, Vec::len),
                    "snapshot file loaded"
                );
                self.last_error = None;
                Some(snapshot)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "snapshot parse failed");
                self.last_error = Some(format!("Parse error: {}", e));
                None
            }
        }
    }
}

/// Parse either file shape into a snapshot.
pub fn parse_snapshot(content: &str) -> serde_json::Result<TwinSnapshot> {
    let value: Value = serde_json::from_str(content)?;
    let bare_topology = value.as_object().is_some_and(|o| {
        !o.contains_key("topology") && (o.contains_key("nodes") || o.contains_key("edges"))
    });

    if bare_topology {
        let topology: Topology = serde_json::from_value(value)?;
        Ok(TwinSnapshot::topology(topology))
    } else {
        serde_json::from_value(value)
    }
}

impl DataSource for FileSource {
    fn poll(&mut self) -> Option<TwinSnapshot> {
        let modified = self.modified();
        if !self.is_stale(modified) {
            return None;
        }

        self.force_reload = false;
        let snapshot = self.load()?;
        self.loaded_at = modified;
        Some(snapshot)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn refresh(&mut self) {
        self.force_reload = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SNAPSHOT: &str = r#"{
        "topology": {
            "nodes": [{"id": "n1", "name": "Tank", "type": "tank", "x": 37.33, "y": -121.88}],
            "edges": []
        },
        "sensors": [
            {"id": "s1", "asset_id": "e1", "asset_type": "edge", "type": "pressure", "value": 64.0, "unit": "psi"}
        ]
    }"#;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/twin.json");
        assert_eq!(source.path(), Path::new("/tmp/twin.json"));
        assert_eq!(source.description(), "file: /tmp/twin.json");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_poll_reads_file_once() {
        let file = write_file(SNAPSHOT);
        let mut source = FileSource::new(file.path());

        let snapshot = source.poll().expect("first poll reads the file");
        assert_eq!(snapshot.topology.unwrap().nodes.len(), 1);
        assert_eq!(snapshot.sensors.unwrap().len(), 1);

        assert!(source.poll().is_none());
    }

    #[test]
    fn test_refresh_forces_reload() {
        let file = write_file(SNAPSHOT);
        let mut source = FileSource::new(file.path());
        assert!(source.poll().is_some());
        assert!(source.poll().is_none());

        source.refresh();
        assert!(source.poll().is_some());
    }

    #[test]
    fn test_bare_topology_file() {
        let file = write_file(
            r#"{"nodes": [], "edges": [
                {"id": "e1", "name": "P1", "status": "isolated", "from_node_id": "a", "to_node_id": "b"}
            ]}"#,
        );
        let mut source = FileSource::new(file.path());

        let snapshot = source.poll().unwrap();
        assert_eq!(snapshot.topology.unwrap().edges[0].status, "isolated");
        assert!(snapshot.sensors.is_none());
    }

    #[test]
    fn test_sensors_only_snapshot() {
        let snapshot = parse_snapshot(r#"{"sensors": [], "count": 0}"#).unwrap();
        assert!(snapshot.topology.is_none());
        assert_eq!(snapshot.sensors, Some(Vec::new()));
    }

    #[test]
    fn test_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/twin.json");

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Read error"));
    }

    #[test]
    fn test_invalid_json_then_recovery() {
        let file = write_file("not valid json");
        let mut source = FileSource::new(file.path());

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Parse error"));

        // Nothing was loaded yet, so the next poll retries regardless of mtime
        fs::write(file.path(), SNAPSHOT).unwrap();
        assert!(source.poll().is_some());
        assert!(source.error().is_none());
    }
}
