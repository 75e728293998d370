use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text from page {page}: {message}")]
    PageError { page: usize, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors return the raw text of every page, in page order, blank
/// pages included. Dropping blank pages and joining the rest is done by
/// [`crate::extract::extract_text`] so the policy is the same for every
/// backend.
pub trait PdfBackend: Send + Sync {
    /// Extract the text of each page of a PDF file.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractionError>;
}
