//! Uploaded note files and the text extracted from them.

mod extract;
mod file;
mod library;

pub use extract::{ContentExtractor, PlainTextExtractor};
pub use file::{FileFingerprint, NoteFile};
pub use library::{IngestFailure, IngestReport, NoteLibrary};
