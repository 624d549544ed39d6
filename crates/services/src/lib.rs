#![forbid(unsafe_code)]

pub mod controller;
pub mod error;
pub mod notes;
pub mod notifier;
pub mod quiz_generator;
pub mod quiz_source;

pub use pomo_core::Clock;

pub use controller::{Command, ControllerUpdate, QuizDelivery, SessionController};
pub use error::{ConfigError, ControllerError, ExtractionError, GenerationError};
pub use notes::{ContentExtractor, IngestReport, NoteFile, NoteLibrary, PlainTextExtractor};
pub use notifier::{Notifier, SilentNotifier, TerminalNotifier};
pub use quiz_generator::{Provider, QuizGenerator, QuizGeneratorConfig};
pub use quiz_source::{QuizSource, parse_quiz_payload};
