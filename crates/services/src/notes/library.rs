use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;

use crate::error::ExtractionError;
use crate::notes::{ContentExtractor, FileFingerprint, NoteFile, PlainTextExtractor};

#[derive(Debug)]
pub struct IngestFailure {
    pub name: String,
    pub error: ExtractionError,
}

/// Outcome of one upload batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub accepted: Vec<String>,
    pub duplicates: Vec<String>,
    pub failures: Vec<IngestFailure>,
    /// Extracted text of the accepted files, in input order, separated by blank lines.
    pub text: String,
}

impl IngestReport {
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A summary line followed by one line per duplicate and per failure.
impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added {} file(s), skipped {} duplicate(s), {} failed",
            self.accepted.len(),
            self.duplicates.len(),
            self.failures.len()
        )?;
        for name in &self.duplicates {
            write!(f, "\n  {name}: already added")?;
        }
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.name, failure.error)?;
        }
        Ok(())
    }
}

/// Every file ever offered, keyed by fingerprint, plus the extractor used on
/// new ones.
#[derive(Clone)]
pub struct NoteLibrary {
    extractor: Arc<dyn ContentExtractor>,
    seen: HashSet<FileFingerprint>,
}

impl Default for NoteLibrary {
    fn default() -> Self {
        Self::new(Arc::new(PlainTextExtractor))
    }
}

impl NoteLibrary {
    #[must_use]
    pub fn new(extractor: Arc<dyn ContentExtractor>) -> Self {
        Self {
            extractor,
            seen: HashSet::new(),
        }
    }

    #[must_use]
    pub fn contains(&self, fingerprint: &FileFingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Extract text from every file not seen before.
    ///
    /// A file is remembered as soon as it is offered, so a file whose
    /// extraction fails is skipped as a duplicate next time too.
    pub async fn ingest(&mut self, files: Vec<NoteFile>) -> IngestReport {
        let mut report = IngestReport::default();
        let mut fresh = Vec::with_capacity(files.len());
        for file in files {
            if self.seen.insert(file.fingerprint()) {
                fresh.push(file);
            } else {
                tracing::info!(file = file.name(), "skipping duplicate upload");
                report.duplicates.push(file.name().to_owned());
            }
        }

        let extractor = Arc::clone(&self.extractor);
        let results = join_all(fresh.iter().map(|file| extractor.extract(file))).await;

        let mut texts = Vec::new();
        for (file, result) in fresh.iter().zip(results) {
            match result {
                Ok(text) => {
                    report.accepted.push(file.name().to_owned());
                    texts.push(text);
                }
                Err(error) => {
                    tracing::warn!(file = file.name(), %error, "failed to extract notes");
                    report.failures.push(IngestFailure {
                        name: file.name().to_owned(),
                        error,
                    });
                }
            }
        }
        report.text = texts.join("\n\n");
        report
    }
}
