use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::notes::NoteFile;

/// Turns an uploaded file into plain note text.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// # Errors
    ///
    /// Returns `ExtractionError` when the file cannot be turned into text.
    async fn extract(&self, file: &NoteFile) -> Result<String, ExtractionError>;
}

/// Accepts UTF-8 text formats (plain text, Markdown, CSV).
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

#[async_trait]
impl ContentExtractor for PlainTextExtractor {
    async fn extract(&self, file: &NoteFile) -> Result<String, ExtractionError> {
        if !file.media_type().starts_with("text/") {
            return Err(ExtractionError::UnsupportedFormat(
                file.media_type().to_owned(),
            ));
        }
        let text =
            std::str::from_utf8(file.bytes()).map_err(|_| ExtractionError::InvalidEncoding)?;
        let text = text.trim_start_matches('\u{feff}').trim();
        if text.is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text.to_owned())
    }
}
