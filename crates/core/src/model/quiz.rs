use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::Question;
use crate::time::elapsed_millis;

/// Length of the correct/incorrect feedback window after each answer.
pub const FEEDBACK_WINDOW_MS: i64 = 1_000;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("choice {choice} is not one of the {options} options")]
    InvalidChoice { choice: usize, options: usize },

    #[error("answers are locked until the current feedback ends")]
    InputLocked,

    #[error("quiz is already completed")]
    AlreadyCompleted,

    #[error("quiz is not completed yet")]
    NotCompleted,
}

//
// ─── PHASES & RESULTS ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// The current question accepts a selection and a submit.
    Presenting,
    /// An answer was just recorded; input is ignored until `until`.
    Feedback { correct: bool, until: DateTime<Utc> },
    Completed,
}

/// What a submit (or a timeout) wrote into the answer sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    pub index: usize,
    pub choice: Option<usize>,
    pub correct: bool,
}

/// Outcome of closing a feedback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStep {
    Advanced { index: usize },
    Completed { correct: usize, total: usize },
}

/// One row of the post-quiz review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    pub index: usize,
    pub question: String,
    pub correct_answer: String,
    pub given_answer: Option<String>,
    pub is_correct: bool,
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Progression through one generated quiz.
///
/// Each question has its own countdown, measured from the moment the
/// question went on screen; running out counts as a `None` answer. Every answer opens a short feedback window before the next
/// question (or completion).
#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    questions: Vec<Question>,
    current: usize,
    selected: Option<usize>,
    answers: Vec<Option<usize>>,
    correct_count: usize,
    question_seconds: u32,
    seconds_left: u32,
    question_started: Option<DateTime<Utc>>,
    phase: QuizPhase,
    review_visible: bool,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if `questions` is empty.
    pub fn new(questions: Vec<Question>, question_seconds: u32) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let answers = vec![None; questions.len()];
        Ok(Self {
            questions,
            current: 0,
            selected: None,
            answers,
            correct_count: 0,
            question_seconds,
            seconds_left: question_seconds,
            question_started: None,
            phase: QuizPhase::Presenting,
            review_visible: false,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question on screen, `None` once the quiz is completed.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_completed() {
            None
        } else {
            self.questions.get(self.current)
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// One slot per question; `None` means unanswered or timed out.
    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    #[must_use]
    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    #[must_use]
    pub fn question_seconds(&self) -> u32 {
        self.question_seconds
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.phase == QuizPhase::Completed
    }

    #[must_use]
    pub fn review_visible(&self) -> bool {
        self.review_visible
    }

    /// Start the first question's timer at `now`. Later calls are no-ops.
    pub fn present(&mut self, now: DateTime<Utc>) {
        if self.phase == QuizPhase::Presenting && self.question_started.is_none() {
            self.question_started = Some(now);
        }
    }

    /// Highlight an option without submitting it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InputLocked` during feedback, `AlreadyCompleted`
    /// after the last answer, or `InvalidChoice` for an unknown option.
    pub fn select(&mut self, choice: usize) -> Result<(), QuizError> {
        self.ensure_presenting()?;
        let options = self.questions[self.current].options().len();
        if choice >= options {
            return Err(QuizError::InvalidChoice { choice, options });
        }
        self.selected = Some(choice);
        Ok(())
    }

    /// Submit the current selection (possibly none).
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InputLocked` during feedback or `AlreadyCompleted`
    /// after the last answer.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<AnswerRecord, QuizError> {
        self.ensure_presenting()?;
        Ok(self.record(self.selected, now))
    }

    /// Per-question timer tick. Recomputes the seconds left from when the
    /// question started and returns the timeout answer once they reach zero.
    ///
    /// A quiz that was never presented starts its timer on the first tick.
    pub fn tick_second(&mut self, now: DateTime<Utc>) -> Option<AnswerRecord> {
        if self.phase != QuizPhase::Presenting {
            return None;
        }
        let started = *self.question_started.get_or_insert(now);
        let remaining_ms =
            (u64::from(self.question_seconds) * 1_000).saturating_sub(elapsed_millis(started, now));
        self.seconds_left = u32::try_from(remaining_ms.div_ceil(1_000)).unwrap_or(u32::MAX);
        if self.seconds_left == 0 {
            Some(self.record(None, now))
        } else {
            None
        }
    }

    /// Close the feedback window once it has elapsed.
    pub fn finish_feedback(&mut self, now: DateTime<Utc>) -> Option<QuizStep> {
        let QuizPhase::Feedback { until, .. } = self.phase else {
            return None;
        };
        if now < until {
            return None;
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.selected = None;
            self.seconds_left = self.question_seconds;
            self.question_started = Some(now);
            self.phase = QuizPhase::Presenting;
            Some(QuizStep::Advanced {
                index: self.current,
            })
        } else {
            self.phase = QuizPhase::Completed;
            Some(QuizStep::Completed {
                correct: self.correct_count,
                total: self.questions.len(),
            })
        }
    }

    /// Show or hide the review list. Returns the new visibility.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotCompleted` before the last answer is in.
    pub fn toggle_review(&mut self) -> Result<bool, QuizError> {
        if !self.is_completed() {
            return Err(QuizError::NotCompleted);
        }
        self.review_visible = !self.review_visible;
        Ok(self.review_visible)
    }

    #[must_use]
    pub fn review(&self) -> Vec<ReviewEntry> {
        self.questions
            .iter()
            .zip(&self.answers)
            .enumerate()
            .map(|(index, (question, given))| ReviewEntry {
                index,
                question: question.text().to_owned(),
                correct_answer: question.correct_option().to_owned(),
                given_answer: given.and_then(|i| question.options().get(i).cloned()),
                is_correct: question.is_correct(*given),
            })
            .collect()
    }

    fn ensure_presenting(&self) -> Result<(), QuizError> {
        match self.phase {
            QuizPhase::Presenting => Ok(()),
            QuizPhase::Feedback { .. } => Err(QuizError::InputLocked),
            QuizPhase::Completed => Err(QuizError::AlreadyCompleted),
        }
    }

    fn record(&mut self, choice: Option<usize>, now: DateTime<Utc>) -> AnswerRecord {
        let index = self.current;
        let correct = self.questions[index].is_correct(choice);
        self.answers[index] = choice;
        if correct {
            self.correct_count += 1;
        }
        self.phase = QuizPhase::Feedback {
            correct,
            until: now + Duration::milliseconds(FEEDBACK_WINDOW_MS),
        };
        AnswerRecord {
            index,
            choice,
            correct,
        }
    }
}
