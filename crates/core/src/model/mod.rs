mod mode;
mod question;
mod quiz;
mod settings;

pub use mode::{Mode, Screen};
pub use question::{MIN_OPTIONS, Question, QuestionError};
pub use quiz::{
    AnswerRecord, FEEDBACK_WINDOW_MS, Quiz, QuizError, QuizPhase, QuizStep, ReviewEntry,
};
pub use settings::{ClampedSetting, SettingField, SettingsDraft, SettingsError, TimerSettings};
