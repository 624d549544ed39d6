use std::path::PathBuf;

use clap::Parser;
use pomo_core::model::SettingsDraft;

/// Pomodoro study timer that quizzes you on your own notes.
///
/// Out-of-range values are clamped into range with a warning.
#[derive(Debug, Parser)]
#[command(name = "pomo", version)]
pub struct Args {
    /// Note files to study (plain text, Markdown or CSV).
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Work interval in minutes (1-60).
    #[arg(long, env = "POMO_WORK_MINUTES")]
    pub work: Option<u32>,

    /// Short break in minutes (1-30).
    #[arg(long, env = "POMO_SHORT_BREAK_MINUTES")]
    pub short_break: Option<u32>,

    /// Long break in minutes (1-60).
    #[arg(long, env = "POMO_LONG_BREAK_MINUTES")]
    pub long_break: Option<u32>,

    /// Work intervals before a long break (1-10).
    #[arg(long, env = "POMO_CYCLES")]
    pub cycles: Option<u32>,

    /// Seconds allowed per quiz question (5-120).
    #[arg(long, env = "POMO_QUESTION_SECONDS")]
    pub question_seconds: Option<u32>,

    /// Start with all sounds off.
    #[arg(long, env = "POMO_MUTED")]
    pub muted: bool,

    /// Default log filter when POMO_LOG is unset.
    #[arg(long, env = "POMO_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl Args {
    #[must_use]
    pub fn settings_draft(&self) -> SettingsDraft {
        SettingsDraft {
            work_minutes: self.work,
            short_break_minutes: self.short_break,
            long_break_minutes: self.long_break,
            cycles_before_long_break: self.cycles,
            question_seconds: self.question_seconds,
        }
    }
}
