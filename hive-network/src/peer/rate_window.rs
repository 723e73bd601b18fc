//! A sliding time-window counter, used to rate-limit per-peer message
//! volume (`addr`, `inv`, `getheaders`, ...).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Counts events within a trailing window of fixed duration. Stale entries
/// are dropped lazily, on the next `record`/`count` call.
#[derive(Clone, Debug)]
pub struct RateWindow {
    window: Duration,
    events: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new(window: Duration) -> Self {
        RateWindow {
            window,
            events: VecDeque::new(),
        }
    }

    fn evict_stale(&mut self, now: Instant) {
        while let Some(oldest) = self.events.front() {
            if now.duration_since(*oldest) > self.window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records `count` events at `now` and returns the total number of
    /// events still within the window afterward.
    pub fn record(&mut self, count: usize, now: Instant) -> usize {
        self.evict_stale(now);
        for _ in 0..count {
            self.events.push_back(now);
        }
        self.events.len()
    }

    /// The number of events currently within the window, without recording
    /// a new one.
    pub fn count(&mut self, now: Instant) -> usize {
        self.evict_stale(now);
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_events_older_than_the_window() {
        let mut window = RateWindow::new(Duration::from_secs(60));
        let t0 = Instant::now();
        assert_eq!(window.record(5, t0), 5);
        assert_eq!(window.count(t0 + Duration::from_secs(30)), 5);
        assert_eq!(window.count(t0 + Duration::from_secs(61)), 0);
    }

    #[test]
    fn record_accumulates_within_window() {
        let mut window = RateWindow::new(Duration::from_secs(60));
        let t0 = Instant::now();
        window.record(900, t0);
        assert_eq!(
            window.record(150, t0 + Duration::from_secs(10)),
            1050
        );
    }
}
