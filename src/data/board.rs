//! One animated display per sensor card.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use tracing::trace;

use super::animated::{AnimatedValue, AnimationTiming};
use super::sensors::{AssetSensors, SensorKey};

/// What a [`AnimationBoard::sync`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub mounted: usize,
    pub unmounted: usize,
    pub transitions: usize,
    /// Timers cancelled by unmounting.
    pub cancelled_timers: usize,
}

/// Animated displays keyed by sensor identity.
///
/// A display mounts the first time its sensor shows a value and unmounts,
/// with its timers cancelled, when the sensor disappears from the data.
#[derive(Debug, Default)]
pub struct AnimationBoard {
    timing: AnimationTiming,
    values: BTreeMap<SensorKey, AnimatedValue>,
}

impl AnimationBoard {
    pub fn new(timing: AnimationTiming) -> Self {
        Self {
            timing,
            values: BTreeMap::new(),
        }
    }

    /// Reconcile displays with the latest grouped readings.
    pub fn sync(&mut self, groups: &[AssetSensors], now: Instant) -> SyncReport {
        let mut report = SyncReport::default();
        let mut present = HashSet::new();

        for reading in groups.iter().flat_map(|g| &g.sensors) {
            present.insert(&reading.key);
            let Some(value) = reading.value else {
                continue;
            };
            match self.values.get_mut(&reading.key) {
                Some(display) => {
                    if display.set(value, now) {
                        report.transitions += 1;
                    }
                }
                None => {
                    self.values
                        .insert(reading.key.clone(), AnimatedValue::new(value, self.timing));
                    report.mounted += 1;
                }
            }
        }

        let gone: Vec<SensorKey> = self
            .values
            .keys()
            .filter(|k| !present.contains(k))
            .cloned()
            .collect();
        for key in gone {
            if let Some(mut display) = self.values.remove(&key) {
                report.cancelled_timers += display.unmount();
                report.unmounted += 1;
                trace!(asset = %key.asset_id, kind = %key.kind, "display unmounted");
            }
        }

        report
    }

    /// Advance every display. Returns whether anything changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for display in self.values.values_mut() {
            changed |= display.tick(now);
        }
        changed
    }

    pub fn get(&self, key: &SensorKey) -> Option<&AnimatedValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Earliest pending deadline across all displays.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.values.values().filter_map(|v| v.next_deadline()).min()
    }

    /// Unmount everything.
    pub fn clear(&mut self) -> usize {
        let cancelled = self.values.values_mut().map(|v| v.unmount()).sum();
        self.values.clear();
        cancelled
    }
}
