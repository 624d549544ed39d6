use thiserror::Error;

use crate::model::{QuizError, SettingsError};

/// Errors surfaced by `Session` transitions.
///
/// None of these are fatal: the caller shows them inline and the session
/// stays in the state it was in before the rejected transition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("add at least one file with readable notes before starting")]
    NotesRequired,

    #[error("the timer is not open")]
    NotOnTimer,

    #[error("finish and close the quiz first")]
    QuizInProgress,

    #[error("no quiz is open")]
    QuizNotOpen,

    #[error("the quiz is still being generated")]
    QuizLoading,

    #[error("no quiz is available for this interval")]
    QuizUnavailable,

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Quiz(#[from] QuizError),
}
