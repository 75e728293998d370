//! Extraction against small PDFs written on the fly.

use std::path::{Path, PathBuf};

use lexsum_core::{ExtractionError, PdfBackend, extract_text};
use lexsum_pdf_mupdf::MupdfBackend;

/// Writes a PDF with one page per content stream, all pages sharing a
/// Helvetica font. Offsets in the xref table are computed from the bytes.
fn write_pdf(dir: &Path, name: &str, contents: &[&str]) -> PathBuf {
    let n = contents.len();
    let font_id = 3 + 2 * n;
    let mut objects: Vec<String> = Vec::new();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    for (i, content) in contents.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
            font_id,
            4 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );

    let path = dir.join(name);
    std::fs::write(&path, out).unwrap();
    path
}

fn text_stream(line: &str) -> String {
    format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", line)
}

#[test]
fn blank_pages_are_dropped_from_joined_text() {
    let dir = tempfile::tempdir().unwrap();
    let first = text_stream("This Agreement is made between the parties");
    let third = text_stream("IN WITNESS WHEREOF the parties have signed");
    let path = write_pdf(dir.path(), "contract.pdf", &[&first, "", &third]);

    let extracted = extract_text(&path, &MupdfBackend::new()).unwrap();

    assert_eq!(extracted.pages_total, 3);
    assert_eq!(extracted.pages_kept, 2);
    assert!(extracted.text.contains("This Agreement is made between the parties"));
    assert!(extracted.text.contains("IN WITNESS WHEREOF"));
    let agreement = extracted.text.find("Agreement").unwrap();
    let witness = extracted.text.find("WITNESS").unwrap();
    assert!(agreement < witness);
}

#[test]
fn pages_come_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = text_stream("first page");
    let b = text_stream("second page");
    let path = write_pdf(dir.path(), "two.pdf", &[&a, &b]);

    let pages = MupdfBackend::new().extract_pages(&path).unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].trim(), "first page");
    assert_eq!(pages[1].trim(), "second page");
}

#[test]
fn drawing_only_pdf_yields_no_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "scanned.pdf",
        &["0 0 m 200 200 l S", "10 10 100 100 re f"],
    );

    let extracted = extract_text(&path, &MupdfBackend::new()).unwrap();

    assert_eq!(extracted.pages_total, 2);
    assert_eq!(extracted.pages_kept, 0);
    assert_eq!(extracted.text, "");
    assert_eq!(extracted.meaningful_chars(), 0);
}

#[test]
fn garbage_bytes_fail_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.pdf");
    std::fs::write(&path, b"this is not a pdf at all").unwrap();

    let result = extract_text(&path, &MupdfBackend::new());

    assert!(result.is_err());
}

#[test]
fn missing_file_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MupdfBackend::new()
        .extract_pages(&dir.path().join("absent.pdf"))
        .unwrap_err();

    assert!(matches!(err, ExtractionError::OpenError(_)));
}
