use std::fmt;

use serde::Serialize;

/// Which interval the countdown is measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Timer screen shown but nothing started yet (or after a reset).
    Idle,
    Work,
    ShortBreak,
    LongBreak,
}

impl Mode {
    #[must_use]
    pub fn is_break(self) -> bool {
        matches!(self, Mode::ShortBreak | Mode::LongBreak)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Work => "work",
            Mode::ShortBreak => "short break",
            Mode::LongBreak => "long break",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Top-level screen of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Notes are collected here; the countdown is not reachable.
    Landing,
    Timer,
}
