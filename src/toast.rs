//! Transient notifications shown in the corner of the screen.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a toast stays up.
pub const TOAST_TTL: Duration = Duration::from_secs(5);

/// At most this many toasts are kept; older ones are dropped first.
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
    /// Safety-relevant events such as a pipe isolation.
    Alert,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub description: Option<String>,
    pub created: Instant,
}

/// Queue of live toasts, newest last.
#[derive(Debug)]
pub struct Toasts {
    queue: VecDeque<Toast>,
    ttl: Duration,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new(TOAST_TTL)
    }
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, level: ToastLevel, title: impl Into<String>, now: Instant) {
        self.push_with(level, title, None, now);
    }

    pub fn push_with(
        &mut self,
        level: ToastLevel,
        title: impl Into<String>,
        description: Option<String>,
        now: Instant,
    ) {
        self.queue.push_back(Toast {
            level,
            title: title.into(),
            description,
            created: now,
        });
        while self.queue.len() > MAX_TOASTS {
            self.queue.pop_front();
        }
    }

    /// Drop expired toasts. Returns whether any were removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.queue.len();
        let ttl = self.ttl;
        self.queue
            .retain(|t| now.saturating_duration_since(t.created) < ttl);
        self.queue.len() != before
    }

    /// Oldest first; `.rev()` gives newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Toast> + ExactSizeIterator {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Close every toast.
    pub fn dismiss_all(&mut self) {
        self.queue.clear();
    }
}
