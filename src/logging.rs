//! Log output setup.
//!
//! The dashboard owns the terminal, so logs only go to a file. Without a
//! log file nothing is installed and `tracing` macros are no-ops.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Install a file subscriber. `RUST_LOG` wins over `level`.
pub fn init(file: Option<&Path>, level: &str) -> Result<bool> {
    let Some(path) = file else {
        return Ok(false);
    };

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {:?}", level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {}", e))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_file_installs_nothing() {
        assert!(!init(None, "info").unwrap());
    }

    #[test]
    fn test_unwritable_file_fails() {
        assert!(init(Some(Path::new("/nonexistent/dir/twinwatch.log")), "info").is_err());
    }
}
