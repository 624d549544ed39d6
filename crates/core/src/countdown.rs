use chrono::{DateTime, Utc};

use crate::time::elapsed_millis;

/// Epoch-based countdown.
///
/// Remaining time is stored as it was when the epoch was captured and is
/// recomputed from the wall clock on every tick, so late or skipped ticks
/// never accumulate drift. Pausing folds the elapsed time back into the stored
/// remainder with millisecond precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining_ms: u64,
    epoch: Option<DateTime<Utc>>,
    remaining_secs: u32,
}

impl Countdown {
    #[must_use]
    pub fn new(secs: u32) -> Self {
        Self {
            remaining_ms: u64::from(secs) * 1_000,
            epoch: None,
            remaining_secs: secs,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.epoch.is_some()
    }

    /// Whole seconds left as of the last tick, rounded up.
    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Stop and set a fresh remaining time.
    pub fn rebase(&mut self, secs: u32) {
        *self = Self::new(secs);
    }

    /// Capture `now` as the epoch. Returns `false` if already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.epoch.is_some() {
            return false;
        }
        self.epoch = Some(now);
        true
    }

    /// Freeze the remaining time at `now`. Returns `false` if not running.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.epoch.is_none() {
            return false;
        }
        self.remaining_ms = self.remaining_ms_at(now);
        self.remaining_secs = whole_secs(self.remaining_ms);
        self.epoch = None;
        true
    }

    /// Stop without reading the clock; the last ticked value is kept.
    pub fn stop(&mut self) {
        if self.epoch.take().is_some() {
            self.remaining_ms = u64::from(self.remaining_secs) * 1_000;
        }
    }

    /// Recompute the remaining seconds from the epoch. No-op when stopped.
    pub fn tick(&mut self, now: DateTime<Utc>) -> u32 {
        if self.epoch.is_some() {
            self.remaining_secs = whole_secs(self.remaining_ms_at(now));
        }
        self.remaining_secs
    }

    fn remaining_ms_at(&self, now: DateTime<Utc>) -> u64 {
        match self.epoch {
            Some(epoch) => self
                .remaining_ms
                .saturating_sub(elapsed_millis(epoch, now)),
            None => self.remaining_ms,
        }
    }
}

fn whole_secs(ms: u64) -> u32 {
    u32::try_from(ms.div_ceil(1_000)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::time::fixed_now;

    fn at(ms: i64) -> DateTime<Utc> {
        fixed_now() + Duration::milliseconds(ms)
    }

    #[test]
    fn tick_uses_elapsed_since_epoch() {
        let mut countdown = Countdown::new(60);
        countdown.start(at(0));
        assert_eq!(countdown.tick(at(100)), 60);
        assert_eq!(countdown.tick(at(999)), 60);
        assert_eq!(countdown.tick(at(1_000)), 59);
        // A late tick lands on the same value as a punctual one.
        assert_eq!(countdown.tick(at(25_000)), 35);
        assert_eq!(countdown.tick(at(24_900)), 36);
    }

    #[test]
    fn never_goes_below_zero_or_above_duration() {
        let mut countdown = Countdown::new(10);
        countdown.start(at(0));
        assert_eq!(countdown.tick(at(3_600_000)), 0);

        let mut countdown = Countdown::new(10);
        countdown.start(at(5_000));
        // Clock stepped backwards.
        assert_eq!(countdown.tick(at(0)), 10);
    }

    #[test]
    fn pause_preserves_remaining_exactly() {
        let mut countdown = Countdown::new(60);
        countdown.start(at(0));
        assert!(countdown.pause(at(10_400)));
        assert_eq!(countdown.remaining_secs(), 50);

        // Paused time does not count.
        assert_eq!(countdown.tick(at(500_000)), 50);
        countdown.start(at(500_000));
        assert_eq!(countdown.tick(at(500_600)), 49);
        assert_eq!(countdown.tick(at(549_599)), 1);
        assert_eq!(countdown.tick(at(549_600)), 0);
    }

    #[test]
    fn start_twice_is_a_noop() {
        let mut countdown = Countdown::new(60);
        assert!(countdown.start(at(0)));
        assert!(!countdown.start(at(30_000)));
        assert_eq!(countdown.tick(at(30_000)), 30);
    }

    #[test]
    fn tick_while_stopped_changes_nothing() {
        let mut countdown = Countdown::new(60);
        let before = countdown.clone();
        assert_eq!(countdown.tick(at(10_000)), 60);
        assert_eq!(countdown, before);
    }
}
