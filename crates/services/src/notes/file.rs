use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::ExtractionError;

/// Identity used for duplicate detection: same name, size and modification time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileFingerprint {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// An uploaded file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    name: String,
    modified: Option<DateTime<Utc>>,
    media_type: String,
    bytes: Vec<u8>,
}

impl NoteFile {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, modified: Option<DateTime<Utc>>) -> Self {
        let name = name.into();
        let media_type = media_type_for(&name).to_owned();
        Self {
            name,
            modified,
            media_type,
            bytes,
        }
    }

    /// Convenience for text content.
    #[must_use]
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, text.as_bytes().to_vec(), None)
    }

    /// Read a file from disk.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Io` if the file cannot be read.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let path = path.as_ref();
        let io_err = |source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, bytes, modified))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[must_use]
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn fingerprint(&self) -> FileFingerprint {
        FileFingerprint {
            name: self.name.clone(),
            size: self.size(),
            modified: self.modified,
        }
    }
}

fn media_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("txt" | "text") => "text/plain",
        Some("md" | "markdown") => "text/markdown",
        Some("csv") => "text/csv",
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => "application/octet-stream",
    }
}
