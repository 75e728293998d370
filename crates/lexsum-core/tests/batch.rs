//! Batch runs over fake PDFs: saved, skipped and failed documents.

mod common;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use common::echo_handle;
use lexsum_core::batch::DocumentReport;
use lexsum_core::{
    BatchRunner, Device, DocumentError, DocumentOutcome, ExtractionError, GenerationConfig,
    PdfBackend, ProgressEvent, SummarizerConfig,
};

/// Serves canned page lists keyed by file name.
struct FakePdfs(HashMap<&'static str, Option<Vec<String>>>);

impl PdfBackend for FakePdfs {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractionError> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match self.0.get(name) {
            Some(Some(pages)) => Ok(pages.clone()),
            Some(None) => Err(ExtractionError::OpenError("format error: no objects found".into())),
            None => Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            ))),
        }
    }
}

fn contract_page() -> String {
    "CONTRACT ".repeat(20)
}

fn backend() -> FakePdfs {
    let mut pdfs = HashMap::new();
    pdfs.insert(
        "contract.pdf",
        Some(vec![contract_page(), contract_page(), contract_page()]),
    );
    pdfs.insert("scanned.pdf", Some(vec![String::new(), " \n ".to_string()]));
    pdfs.insert("corrupt.pdf", None);
    FakePdfs(pdfs)
}

fn config() -> SummarizerConfig {
    SummarizerConfig {
        decoder_max_len: 64,
        generation: GenerationConfig {
            min_length: 16,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn outcome_for<'a>(documents: &'a [DocumentReport], name: &str) -> &'a DocumentOutcome {
    &documents
        .iter()
        .find(|d| d.input.file_name().unwrap() == name)
        .unwrap()
        .outcome
}

#[test]
fn text_pdf_is_summarized_to_stem_named_file() {
    let out = tempfile::tempdir().unwrap();
    let output_dir = out.path().join("output_summaries");
    let handle = echo_handle(Device::Cpu);
    let pdfs = backend();
    let config = config();
    let runner = BatchRunner::new(&pdfs, &handle, &config, &output_dir);

    let report = runner
        .run(&[PathBuf::from("in/contract.pdf")], |_| {})
        .unwrap();

    assert_eq!(report.saved(), 1);
    let written = output_dir.join("contract_summary.txt");
    let summary = std::fs::read_to_string(&written).unwrap();
    assert!(!summary.is_empty());
    assert!(summary.len() < contract_page().len() * 3);
    match outcome_for(&report.documents, "contract.pdf") {
        DocumentOutcome::Saved {
            output,
            summary_chars,
            generated_tokens,
        } => {
            assert_eq!(output, &written);
            assert_eq!(*summary_chars, summary.chars().count());
            assert!(*generated_tokens >= 16 && *generated_tokens <= 64);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn image_only_pdf_is_skipped_without_output() {
    let out = tempfile::tempdir().unwrap();
    let handle = echo_handle(Device::Cpu);
    let pdfs = backend();
    let config = config();
    let runner = BatchRunner::new(&pdfs, &handle, &config, out.path());

    let mut events = Vec::new();
    let report = runner
        .run(&[PathBuf::from("scanned.pdf")], |e| events.push(e))
        .unwrap();

    assert_eq!(report.skipped(), 1);
    assert!(matches!(
        outcome_for(&report.documents, "scanned.pdf"),
        DocumentOutcome::Skipped { chars: 0 }
    ));
    assert!(!out.path().join("scanned_summary.txt").exists());
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Skipped { min: 100, .. })));
    assert!(!events.iter().any(|e| matches!(e, ProgressEvent::Generating { .. })));
}

#[test]
fn corrupt_pdf_fails_and_batch_continues() {
    let out = tempfile::tempdir().unwrap();
    let handle = echo_handle(Device::Cpu);
    let pdfs = backend();
    let config = config();
    let runner = BatchRunner::new(&pdfs, &handle, &config, out.path());

    let files = [
        PathBuf::from("corrupt.pdf"),
        PathBuf::from("missing.pdf"),
        PathBuf::from("contract.pdf"),
    ];
    let mut failed = Vec::new();
    let report = runner
        .run(&files, |e| {
            if let ProgressEvent::Failed { path, message, .. } = e {
                failed.push((path, message));
            }
        })
        .unwrap();

    assert_eq!(report.documents.len(), 3);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.saved(), 1);
    assert!(matches!(
        outcome_for(&report.documents, "corrupt.pdf"),
        DocumentOutcome::Failed(DocumentError::Extraction(ExtractionError::OpenError(_)))
    ));
    assert_eq!(failed[0].0, PathBuf::from("corrupt.pdf"));
    assert!(failed[0].1.contains("format error"));
    assert!(out.path().join("contract_summary.txt").exists());
}

#[test]
fn events_follow_processing_order() {
    let out = tempfile::tempdir().unwrap();
    let handle = echo_handle(Device::Cpu);
    let pdfs = backend();
    let config = config();
    let runner = BatchRunner::new(&pdfs, &handle, &config, out.path());

    let mut events = Vec::new();
    runner
        .run(&[PathBuf::from("contract.pdf")], |e| events.push(e))
        .unwrap();

    assert!(matches!(
        events.as_slice(),
        [
            ProgressEvent::Processing { index: 0, total: 1, .. },
            ProgressEvent::Extracted { pages_kept: 3, pages_total: 3, .. },
            ProgressEvent::Generating { index: 0 },
            ProgressEvent::Saved { index: 0, .. },
        ]
    ));
}

#[test]
fn unwritable_output_dir_aborts_run() {
    let out = tempfile::tempdir().unwrap();
    let blocker = out.path().join("file");
    std::fs::write(&blocker, b"not a dir").unwrap();
    let handle = echo_handle(Device::Cpu);
    let pdfs = backend();
    let config = config();
    let runner = BatchRunner::new(&pdfs, &handle, &config, blocker.join("out"));

    assert!(runner.run(&[PathBuf::from("contract.pdf")], |_| {}).is_err());
}
