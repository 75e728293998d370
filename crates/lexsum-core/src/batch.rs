use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::generation::GenerationError;
use crate::model::ModelHandle;
use crate::pipeline::SummarizerConfig;
use crate::{ExtractionError, PdfBackend, extract_text};

/// Suffix appended to the input stem to name the output file.
pub const SUMMARY_SUFFIX: &str = "_summary.txt";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("not enough text ({chars} characters, need at least {min})")]
    InsufficientText { chars: usize, min: usize },
    #[error("summarization failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("failed to write summary: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to one input document.
#[derive(Debug)]
pub enum DocumentOutcome {
    Saved {
        output: PathBuf,
        summary_chars: usize,
        generated_tokens: usize,
    },
    /// Too little text to summarize; no output written.
    Skipped { chars: usize },
    Failed(DocumentError),
}

#[derive(Debug)]
pub struct DocumentReport {
    pub input: PathBuf,
    pub outcome: DocumentOutcome,
}

/// Per-document outcomes of a batch run, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Saved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&DocumentOutcome) -> bool) -> usize {
        self.documents.iter().filter(|d| pred(&d.outcome)).count()
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Processing {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Extracted {
        index: usize,
        chars: usize,
        pages_kept: usize,
        pages_total: usize,
    },
    Generating {
        index: usize,
    },
    Saved {
        index: usize,
        output: PathBuf,
        summary_chars: usize,
    },
    Skipped {
        index: usize,
        path: PathBuf,
        chars: usize,
        min: usize,
    },
    Failed {
        index: usize,
        path: PathBuf,
        message: String,
    },
}

/// Output path for `input`: `<output_dir>/<stem>_summary.txt`.
pub fn summary_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{}{}", stem, SUMMARY_SUFFIX))
}

/// PDF files directly inside `dir`, sorted by file name.
pub fn discover_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }
    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(pdfs)
}

/// Runs extract → summarize → write for each document, one at a time.
pub struct BatchRunner<'a> {
    backend: &'a dyn PdfBackend,
    model: &'a ModelHandle,
    config: &'a SummarizerConfig,
    output_dir: PathBuf,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        backend: &'a dyn PdfBackend,
        model: &'a ModelHandle,
        config: &'a SummarizerConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            model,
            config,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process `files` in order. A failing document is recorded and the
    /// batch moves on; only failing to create the output folder aborts.
    pub fn run(
        &self,
        files: &[PathBuf],
        mut progress: impl FnMut(ProgressEvent),
    ) -> std::io::Result<BatchReport> {
        std::fs::create_dir_all(&self.output_dir)?;
        let total = files.len();
        let mut report = BatchReport::default();

        for (index, path) in files.iter().enumerate() {
            progress(ProgressEvent::Processing {
                index,
                total,
                path: path.clone(),
            });

            let outcome = match self.process(index, path, &mut progress) {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %error, "document failed");
                    progress(ProgressEvent::Failed {
                        index,
                        path: path.clone(),
                        message: error.to_string(),
                    });
                    DocumentOutcome::Failed(error)
                }
            };
            report.documents.push(DocumentReport {
                input: path.clone(),
                outcome,
            });
        }

        tracing::info!(
            total,
            saved = report.saved(),
            skipped = report.skipped(),
            failed = report.failed(),
            "batch complete"
        );
        Ok(report)
    }

    fn process(
        &self,
        index: usize,
        path: &Path,
        progress: &mut impl FnMut(ProgressEvent),
    ) -> Result<DocumentOutcome, DocumentError> {
        let extracted = extract_text(path, self.backend)?;
        let chars = extracted.meaningful_chars();
        progress(ProgressEvent::Extracted {
            index,
            chars,
            pages_kept: extracted.pages_kept,
            pages_total: extracted.pages_total,
        });

        if chars < self.config.min_text_chars {
            tracing::warn!(path = %path.display(), chars, "skipping document with too little text");
            progress(ProgressEvent::Skipped {
                index,
                path: path.to_path_buf(),
                chars,
                min: self.config.min_text_chars,
            });
            return Ok(DocumentOutcome::Skipped { chars });
        }

        progress(ProgressEvent::Generating { index });
        let summary = self.model.summarize(&extracted.text, self.config)?;

        let output = summary_path(path, &self.output_dir);
        std::fs::write(&output, &summary.text)?;
        let summary_chars = summary.text.chars().count();
        progress(ProgressEvent::Saved {
            index,
            output: output.clone(),
            summary_chars,
        });

        Ok(DocumentOutcome::Saved {
            output,
            summary_chars,
            generated_tokens: summary.generated_tokens,
        })
    }
}
