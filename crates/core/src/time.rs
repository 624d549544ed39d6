use chrono::{DateTime, Duration, Utc};

/// Where the controller reads "now" before every session transition.
///
/// `Session` itself never touches the system time. `Fixed` lets tests step
/// the countdown and the per-question timer in exact milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Steps a fixed clock; the system clock ignores it.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Same as `advance`, in the countdown's unit.
    pub fn advance_millis(&mut self, millis: i64) {
        self.advance(Duration::milliseconds(millis));
    }
}

/// Milliseconds from `since` to `now`. A clock that stepped backwards counts
/// as no time at all, so timers never gain time.
#[must_use]
pub fn elapsed_millis(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - since).num_milliseconds()).unwrap_or(0)
}

/// Unix seconds at which every timer test starts (2024-09-02T09:00:00Z).
pub const STUDY_START_SECS: i64 = 1_725_267_600;

/// `STUDY_START_SECS` as a timestamp.
///
/// # Panics
///
/// Never in practice; the constant is a valid timestamp.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(STUDY_START_SECS, 0).expect("study start is a valid timestamp")
}

/// A `Clock::Fixed` at `fixed_now()`.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance_millis(1_500);
        assert_eq!(elapsed_millis(fixed_now(), clock.now()), 1_500);
    }

    #[test]
    fn system_clock_ignores_advance() {
        let mut clock = Clock::system();
        let before = clock.now();
        clock.advance(Duration::hours(1));
        assert!(clock.now() - before < Duration::minutes(1));
    }

    #[test]
    fn elapsed_clamps_backwards_clock() {
        let later = fixed_now() + Duration::seconds(3);
        assert_eq!(elapsed_millis(later, fixed_now()), 0);
    }
}
