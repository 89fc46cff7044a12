//! Animated numeric readings.
//!
//! An [`AnimatedValue`] shows the latest reading in full weight and keeps a
//! short-lived record of the value it replaced. The record is held for a
//! moment, then collapses, then disappears:
//!
//! ```text
//!            distinct value              hold elapsed             collapse elapsed
//!   Idle ─────────────────────▶ Showing ─────────────▶ Collapsing ─────────────────▶ Idle
//!     ▲                           │  ▲                    │
//!     │                           └──┴────────────────────┘
//!     │                      distinct value: restart from the value on screen
//! ```
//!
//! Time is never read internally; callers pass `now` so the render loop
//! (and the tests) decide when deadlines are checked.

use std::time::{Duration, Instant};

use super::timer::Timer;

/// How long the prior value stays fully visible before it starts collapsing.
pub const DEFAULT_HOLD: Duration = Duration::from_millis(2000);

/// How long the prior value takes to shrink and fade away.
pub const DEFAULT_COLLAPSE: Duration = Duration::from_millis(1000);

/// Hold and collapse durations for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTiming {
    pub hold: Duration,
    pub collapse: Duration,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            hold: DEFAULT_HOLD,
            collapse: DEFAULT_COLLAPSE,
        }
    }
}

impl AnimationTiming {
    /// Total time a prior value is on screen.
    pub fn total(&self) -> Duration {
        self.hold + self.collapse
    }
}

/// Visual phase of the prior-value record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No prior value shown.
    #[default]
    Idle,
    /// Prior value visible at full size.
    Showing,
    /// Prior value shrinking and fading.
    Collapsing,
}

/// Which way the reading moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A numeric reading with a transient record of the value it superseded.
#[derive(Debug, Clone)]
pub struct AnimatedValue {
    displayed: f64,
    prior: Option<f64>,
    phase: Phase,
    timing: AnimationTiming,
    hold: Timer,
    collapse: Timer,
    mounted: bool,
}

impl AnimatedValue {
    /// Mount a display showing `initial`, with no prior value.
    pub fn new(initial: f64, timing: AnimationTiming) -> Self {
        Self {
            displayed: initial,
            prior: None,
            phase: Phase::Idle,
            timing,
            hold: Timer::new(),
            collapse: Timer::new(),
            mounted: true,
        }
    }

    /// The value rendered as primary.
    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    /// The value being phased out, if any.
    pub fn prior(&self) -> Option<f64> {
        self.prior
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timing(&self) -> AnimationTiming {
        self.timing
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Direction of the in-flight transition.
    pub fn direction(&self) -> Option<Direction> {
        let prior = self.prior?;
        if self.displayed >= prior {
            Some(Direction::Up)
        } else {
            Some(Direction::Down)
        }
    }

    /// Number of timers still waiting to fire (0, 1 or 2).
    pub fn pending_timers(&self) -> usize {
        usize::from(self.hold.is_pending()) + usize::from(self.collapse.is_pending())
    }

    /// Earliest pending deadline, used to wake the render loop.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.hold.deadline(), self.collapse.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Feed a new reading.
    ///
    /// Returns `true` if a transition started. Equal readings (compared at
    /// full precision) and non-finite readings leave everything untouched,
    /// including pending timers.
    pub fn set(&mut self, value: f64, now: Instant) -> bool {
        if !self.mounted || !value.is_finite() || value == self.displayed {
            return false;
        }

        self.hold.cancel();
        self.collapse.cancel();

        self.prior = Some(self.displayed);
        self.displayed = value;
        self.phase = Phase::Showing;

        self.hold.schedule_after(now, self.timing.hold);
        self.collapse.schedule_after(now, self.timing.total());
        true
    }

    /// Advance the transition to `now`.
    ///
    /// Returns `true` if the phase changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.mounted {
            return false;
        }

        let mut changed = false;
        if self.hold.fire(now) {
            self.phase = Phase::Collapsing;
            changed = true;
        }
        if self.phase == Phase::Collapsing && self.collapse.fire(now) {
            self.prior = None;
            self.phase = Phase::Idle;
            changed = true;
        }
        changed
    }

    /// Fraction of the collapse that has elapsed, in `0.0..=1.0`.
    ///
    /// Zero while the prior value is fully shown or absent.
    pub fn collapse_progress(&self, now: Instant) -> f64 {
        if self.phase != Phase::Collapsing {
            return 0.0;
        }
        let total = self.timing.collapse.as_secs_f64();
        if total <= 0.0 {
            return 1.0;
        }
        let remaining = self
            .collapse
            .remaining(now)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        (1.0 - remaining / total).clamp(0.0, 1.0)
    }

    /// Tear the display down, cancelling its timers.
    ///
    /// Nothing mutates the display afterwards. Returns the number of
    /// timers that were still pending.
    pub fn unmount(&mut self) -> usize {
        let pending = self.pending_timers();
        self.hold.cancel();
        self.collapse.cancel();
        self.mounted = false;
        pending
    }
}

/// Format a reading the way every display shows it: one decimal place.
pub fn format_reading(value: f64) -> String {
    format!("{:.1}", value)
}
