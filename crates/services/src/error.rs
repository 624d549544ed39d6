//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use pomo_core::SessionError;
use pomo_core::model::QuestionError;

use crate::notes::IngestReport;

/// Errors emitted while generating a quiz.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("quiz generation is not configured")]
    Disabled,
    #[error("quiz provider returned an empty response")]
    EmptyResponse,
    #[error("quiz request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("quiz response is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("quiz response has an unexpected shape: {0}")]
    UnexpectedShape(String),
    #[error("question {index} is invalid: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },
    #[error("quiz response contains no questions")]
    NoQuestions,
    #[error("quiz generation task failed: {0}")]
    Task(String),
}

/// Errors emitted while reading `QuizGeneratorConfig` from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid base url {value:?}: {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unknown AI provider {0:?}, expected `openai` or `anthropic`")]
    UnknownProvider(String),
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Errors emitted while turning an uploaded file into note text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractionError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("file is not valid UTF-8 text")]
    InvalidEncoding,
    #[error("file contains no text")]
    Empty,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors emitted by `SessionController::apply`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("none of the added files produced new notes: {report}")]
    NothingIngested { report: IngestReport },
}
