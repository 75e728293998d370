use std::path::Path;

use crate::{ExtractedText, ExtractionError, PdfBackend};

/// Extract the text of a PDF via `backend`.
///
/// Pages whose text is empty or whitespace-only are dropped; the remaining
/// pages are joined with a single newline in page order. A PDF with no
/// extractable text yields an empty string, not an error.
pub fn extract_text(path: &Path, backend: &dyn PdfBackend) -> Result<ExtractedText, ExtractionError> {
    let pages = backend.extract_pages(path)?;
    let extracted = join_pages(pages);
    tracing::debug!(
        path = %path.display(),
        pages_total = extracted.pages_total,
        pages_kept = extracted.pages_kept,
        chars = extracted.text.len(),
        "extracted text"
    );
    Ok(extracted)
}

/// Join page texts, skipping blank pages.
pub fn join_pages<I>(pages: I) -> ExtractedText
where
    I: IntoIterator<Item = String>,
{
    let mut pages_total = 0;
    let mut kept = Vec::new();
    for page in pages {
        pages_total += 1;
        if !page.trim().is_empty() {
            kept.push(page);
        }
    }
    ExtractedText {
        pages_kept: kept.len(),
        text: kept.join("\n"),
        pages_total,
    }
}
