use std::path::Path;

use mupdf::{Document, TextPageFlags};

use lexsum_core::{ExtractionError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the only one that links mupdf (AGPL-3.0); the pipeline
/// and model crates stay free of it.
///
/// Text is read block by block and line by line, one newline per line,
/// which matches PyMuPDF's `page.get_text()` layout.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    keep_ligatures: bool,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep typographic ligatures (`ﬁ`, `ﬂ`, …) instead of expanding them.
    pub fn with_ligatures(mut self, keep: bool) -> Self {
        self.keep_ligatures = keep;
        self
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractionError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| ExtractionError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| ExtractionError::OpenError(e.to_string()))?;

        let mut pages_text = Vec::new();

        for (index, page_result) in document
            .pages()
            .map_err(|e| ExtractionError::OpenError(e.to_string()))?
            .enumerate()
        {
            let page_error = |e: mupdf::Error| ExtractionError::PageError {
                page: index + 1,
                message: e.to_string(),
            };
            let page = page_result.map_err(page_error)?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(page_error)?;

            let mut page_text = String::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    page_text.push_str(&line_text);
                    page_text.push('\n');
                }
            }

            if self.keep_ligatures {
                pages_text.push(page_text);
            } else {
                pages_text.push(expand_ligatures(&page_text));
            }
        }

        Ok(pages_text)
    }
}

/// Expand typographic ligatures (ﬁ → fi, ﬂ → fl, etc.)
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}
