use serde::Serialize;
use thiserror::Error;

/// Fewest options a multiple-choice question may carry.
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least 2 options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct option {index} is out of bounds for {options} options")]
    CorrectOutOfRange { index: usize, options: usize },
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    text: String,
    options: Vec<String>,
    correct_index: usize,
}

impl Question {
    /// Build a question, trimming text and options.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text or an option is blank, fewer than
    /// `MIN_OPTIONS` options are given, or `correct_index` does not point at an option.
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, QuestionError> {
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
            });
        }
        let options: Vec<String> = options
            .into_iter()
            .map(|option| option.trim().to_owned())
            .collect();
        if let Some(index) = options.iter().position(String::is_empty) {
            return Err(QuestionError::EmptyOption { index });
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectOutOfRange {
                index: correct_index,
                options: options.len(),
            });
        }

        Ok(Self {
            text,
            options,
            correct_index,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    /// A missing answer (timeout) is never correct.
    #[must_use]
    pub fn is_correct(&self, choice: Option<usize>) -> bool {
        choice == Some(self.correct_index)
    }
}
