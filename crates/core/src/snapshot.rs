use serde::Serialize;

use crate::model::{Mode, ReviewEntry, Screen, TimerSettings};

/// Read-only picture of a `Session`, suitable for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub screen: Screen,
    pub mode: Mode,
    pub remaining_secs: u32,
    pub duration_secs: u32,
    pub current_cycle: u32,
    pub cycles_before_long_break: u32,
    pub running: bool,
    pub paused: bool,
    pub alarm_playing: bool,
    pub muted: bool,
    pub has_notes: bool,
    pub settings: TimerSettings,
    /// Present while the quiz modal is open.
    pub quiz: Option<QuizView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuizView {
    Loading,
    Unavailable {
        reason: String,
    },
    Presenting(QuestionView),
    Completed {
        correct: usize,
        total: usize,
        review: Option<Vec<ReviewEntry>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
    pub seconds_left: u32,
    /// `Some(correct)` during the feedback window after an answer.
    pub feedback: Option<bool>,
    pub correct_so_far: usize,
}
