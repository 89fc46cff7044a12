//! Reading history for sparklines.

use std::collections::{HashMap, VecDeque};

use super::sensors::{AssetSensors, SensorKey};

/// Maximum number of readings kept per sensor.
const MAX_HISTORY_SIZE: usize = 60;

/// Tracks recent values per sensor.
///
/// Fed with every sensor update so cards can draw a trend line.
#[derive(Debug, Clone, Default)]
pub struct History {
    readings: HashMap<SensorKey, VecDeque<f64>>,
}

impl History {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current value of every sensor.
    ///
    /// Missing values are skipped, not recorded as zero.
    pub fn record(&mut self, groups: &[AssetSensors]) {
        for reading in groups.iter().flat_map(|g| &g.sensors) {
            let Some(value) = reading.value else {
                continue;
            };
            let values = self.readings.entry(reading.key.clone()).or_default();
            values.push_back(value);
            if values.len() > MAX_HISTORY_SIZE {
                values.pop_front();
            }
        }
    }

    /// Drop sensors no longer present.
    pub fn retain(&mut self, groups: &[AssetSensors]) {
        let live: std::collections::HashSet<&SensorKey> =
            groups.iter().flat_map(|g| &g.sensors).map(|s| &s.key).collect();
        self.readings.retain(|key, _| live.contains(key));
    }

    pub fn values(&self, key: &SensorKey) -> Option<&VecDeque<f64>> {
        self.readings.get(key)
    }

    /// Get sparkline data (normalized to 0-7 for 8 bar levels).
    ///
    /// Returns an empty Vec if there's not enough history.
    pub fn sparkline(&self, key: &SensorKey) -> Vec<u8> {
        let Some(values) = self.readings.get(key) else {
            return Vec::new();
        };
        if values.len() < 2 {
            return Vec::new();
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if range <= f64::EPSILON {
            return vec![3; values.len()];
        }

        values
            .iter()
            .map(|&v| (((v - min) / range * 7.0).round() as u8).min(7))
            .collect()
    }

    /// Change between the last two readings.
    pub fn trend(&self, key: &SensorKey) -> Option<f64> {
        let values = self.readings.get(key)?;
        let last = *values.back()?;
        let previous = *values.get(values.len().checked_sub(2)?)?;
        Some(last - previous)
    }
}

/// Render 0-7 levels as block characters.
pub fn sparkline_str(levels: &[u8]) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    levels.iter().map(|&l| BARS[l.min(7) as usize]).collect()
}
