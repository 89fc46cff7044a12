//! One-shot timers with explicit cancellation.
//!
//! The render loop is single-threaded, so timers never call back on their
//! own. Their owner asks [`Timer::fire`] once per frame with the current
//! instant; a due timer reports `true` exactly once and is then spent.

use std::time::{Duration, Instant};

/// A cancellable one-shot deadline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    /// Create an idle timer with nothing scheduled.
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Schedule the timer to fire at `deadline`, replacing any pending one.
    pub fn schedule(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Schedule the timer to fire `delay` after `now`.
    pub fn schedule_after(&mut self, now: Instant, delay: Duration) {
        self.schedule(now + delay);
    }

    /// Cancel the pending deadline.
    ///
    /// Returns `true` if something was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether a deadline is still waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, saturating at zero.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Fire the timer if its deadline has passed.
    ///
    /// Returns `true` at most once per `schedule` call.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_once() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule_after(start, Duration::from_millis(100));

        assert!(!timer.fire(start));
        assert!(timer.fire(start + Duration::from_millis(100)));
        assert!(!timer.fire(start + Duration::from_millis(200)));
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule_after(start, Duration::from_millis(10));

        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert!(!timer.fire(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule_after(start, Duration::from_millis(10));
        timer.schedule_after(start, Duration::from_millis(500));

        assert!(!timer.fire(start + Duration::from_millis(20)));
        assert_eq!(
            timer.remaining(start + Duration::from_millis(100)),
            Some(Duration::from_millis(400))
        );
    }
}
