use std::fmt;
use std::ops::RangeInclusive;

use serde::Serialize;
use thiserror::Error;

use crate::model::Mode;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: SettingField,
        value: u32,
        min: u32,
        max: u32,
    },
}

//
// ─── FIELDS ────────────────────────────────────────────────────────────────────
//

/// One adjustable timer setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingField {
    WorkMinutes,
    ShortBreakMinutes,
    LongBreakMinutes,
    CyclesBeforeLongBreak,
    QuestionSeconds,
}

impl SettingField {
    /// Accepted values, inclusive.
    #[must_use]
    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            SettingField::WorkMinutes | SettingField::LongBreakMinutes => 1..=60,
            SettingField::ShortBreakMinutes => 1..=30,
            SettingField::CyclesBeforeLongBreak => 1..=10,
            SettingField::QuestionSeconds => 5..=120,
        }
    }

    /// The countdown mode whose duration this field controls, if any.
    #[must_use]
    pub fn mode(self) -> Option<Mode> {
        match self {
            SettingField::WorkMinutes => Some(Mode::Work),
            SettingField::ShortBreakMinutes => Some(Mode::ShortBreak),
            SettingField::LongBreakMinutes => Some(Mode::LongBreak),
            SettingField::CyclesBeforeLongBreak | SettingField::QuestionSeconds => None,
        }
    }

    fn check(self, value: u32) -> Result<u32, SettingsError> {
        let range = self.range();
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(SettingsError::OutOfRange {
                field: self,
                value,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }

    fn clamp(self, value: u32) -> u32 {
        let range = self.range();
        value.clamp(*range.start(), *range.end())
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingField::WorkMinutes => "work minutes",
            SettingField::ShortBreakMinutes => "short break minutes",
            SettingField::LongBreakMinutes => "long break minutes",
            SettingField::CyclesBeforeLongBreak => "cycles before long break",
            SettingField::QuestionSeconds => "seconds per question",
        };
        f.write_str(name)
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Validated timer configuration.
///
/// Durations are chosen in whole minutes and exposed in seconds; every value
/// is inside its `SettingField::range`, so no countdown can start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerSettings {
    work_minutes: u32,
    short_break_minutes: u32,
    long_break_minutes: u32,
    cycles_before_long_break: u32,
    question_seconds: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_minutes: 30,
            short_break_minutes: 12,
            long_break_minutes: 30,
            cycles_before_long_break: 3,
            question_seconds: 20,
        }
    }
}

impl TimerSettings {
    #[must_use]
    pub fn work_minutes(&self) -> u32 {
        self.work_minutes
    }

    #[must_use]
    pub fn short_break_minutes(&self) -> u32 {
        self.short_break_minutes
    }

    #[must_use]
    pub fn long_break_minutes(&self) -> u32 {
        self.long_break_minutes
    }

    #[must_use]
    pub fn cycles_before_long_break(&self) -> u32 {
        self.cycles_before_long_break
    }

    /// Per-question answer window for generated quizzes.
    #[must_use]
    pub fn question_seconds(&self) -> u32 {
        self.question_seconds
    }

    /// Countdown length for `mode`; `Idle` uses the work duration.
    #[must_use]
    pub fn duration_secs(&self, mode: Mode) -> u32 {
        let minutes = match mode {
            Mode::Idle | Mode::Work => self.work_minutes,
            Mode::ShortBreak => self.short_break_minutes,
            Mode::LongBreak => self.long_break_minutes,
        };
        minutes * 60
    }

    #[must_use]
    pub fn get(&self, field: SettingField) -> u32 {
        match field {
            SettingField::WorkMinutes => self.work_minutes,
            SettingField::ShortBreakMinutes => self.short_break_minutes,
            SettingField::LongBreakMinutes => self.long_break_minutes,
            SettingField::CyclesBeforeLongBreak => self.cycles_before_long_break,
            SettingField::QuestionSeconds => self.question_seconds,
        }
    }

    /// Returns a copy with one field replaced.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::OutOfRange` if `value` is outside the field's range.
    pub fn with(mut self, field: SettingField, value: u32) -> Result<Self, SettingsError> {
        let value = field.check(value)?;
        match field {
            SettingField::WorkMinutes => self.work_minutes = value,
            SettingField::ShortBreakMinutes => self.short_break_minutes = value,
            SettingField::LongBreakMinutes => self.long_break_minutes = value,
            SettingField::CyclesBeforeLongBreak => self.cycles_before_long_break = value,
            SettingField::QuestionSeconds => self.question_seconds = value,
        }
        Ok(self)
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated settings as they come from flags, env vars or a form.
/// Missing values fall back to the defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsDraft {
    pub work_minutes: Option<u32>,
    pub short_break_minutes: Option<u32>,
    pub long_break_minutes: Option<u32>,
    pub cycles_before_long_break: Option<u32>,
    pub question_seconds: Option<u32>,
}

/// A value that `SettingsDraft::clamped` had to move into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedSetting {
    pub field: SettingField,
    pub requested: u32,
    pub applied: u32,
}

impl SettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> [(SettingField, Option<u32>); 5] {
        [
            (SettingField::WorkMinutes, self.work_minutes),
            (SettingField::ShortBreakMinutes, self.short_break_minutes),
            (SettingField::LongBreakMinutes, self.long_break_minutes),
            (SettingField::CyclesBeforeLongBreak, self.cycles_before_long_break),
            (SettingField::QuestionSeconds, self.question_seconds),
        ]
    }

    /// Validate every provided value.
    ///
    /// # Errors
    ///
    /// Returns the first `SettingsError::OutOfRange` encountered.
    pub fn validate(self) -> Result<TimerSettings, SettingsError> {
        self.entries()
            .into_iter()
            .try_fold(TimerSettings::default(), |settings, (field, value)| match value {
                Some(value) => settings.with(field, value),
                None => Ok(settings),
            })
    }

    /// Clamp every provided value into range, reporting what moved.
    #[must_use]
    pub fn clamped(self) -> (TimerSettings, Vec<ClampedSetting>) {
        let mut settings = TimerSettings::default();
        let mut adjusted = Vec::new();
        for (field, value) in self.entries() {
            let Some(requested) = value else { continue };
            let applied = field.clamp(requested);
            if applied != requested {
                adjusted.push(ClampedSetting {
                    field,
                    requested,
                    applied,
                });
            }
            if let Ok(next) = settings.with(field, applied) {
                settings = next;
            }
        }
        (settings, adjusted)
    }
}
