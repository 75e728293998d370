use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use lexsum_core::{BatchReport, ProgressEvent};
use owo_colors::OwoColorize;

use crate::prompt::display_name;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

pub fn print_banner(w: &mut dyn Write, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", "PDF Summarization Tool".bold())?;
    } else {
        writeln!(w, "PDF Summarization Tool")?;
    }
    writeln!(w, "----------------------")?;
    Ok(())
}

/// Print a failure line (`ERROR: …`).
pub fn print_error(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "ERROR:".red().bold(), message)
    } else {
        writeln!(w, "ERROR: {}", message)
    }
}

/// Numbered listing of the PDFs found in the input folder.
pub fn print_found_files(
    w: &mut dyn Write,
    dir: &Path,
    files: &[PathBuf],
    color: ColorMode,
) -> std::io::Result<()> {
    let header = format!("Found {} PDF file(s) in {}:", files.len(), dir.display());
    if color.enabled() {
        writeln!(w, "{}", header.cyan())?;
    } else {
        writeln!(w, "{}", header)?;
    }
    for (i, file) in files.iter().enumerate() {
        writeln!(w, "{}. {}", i + 1, display_name(file))?;
    }
    Ok(())
}

pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

pub fn print_model_loaded(
    w: &mut dyn Write,
    model_id: &str,
    device: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {} on {}", "Model loaded:".green(), model_id, device.bold())
    } else {
        writeln!(w, "Model loaded: {} on {}", model_id, device)
    }
}

/// Print a real-time progress event. The generation spinner lives in
/// `active` between `Generating` and the document's final event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    active: &mut Option<ProgressBar>,
    color: ColorMode,
) -> std::io::Result<()> {
    if !matches!(event, ProgressEvent::Generating { .. })
        && let Some(bar) = active.take()
    {
        bar.finish_and_clear();
    }

    match event {
        ProgressEvent::Processing { index, total, path } => {
            writeln!(w)?;
            let line = format!("[{}/{}] Processing: {}", index + 1, total, display_name(path));
            if color.enabled() {
                writeln!(w, "{}", line.bold())?;
            } else {
                writeln!(w, "{}", line)?;
            }
        }
        ProgressEvent::Extracted {
            chars,
            pages_kept,
            pages_total,
            ..
        } => {
            let line = format!(
                "Extracted {} characters from {}/{} pages",
                chars, pages_kept, pages_total
            );
            if color.enabled() {
                writeln!(w, "{}", line.dimmed())?;
            } else {
                writeln!(w, "{}", line)?;
            }
        }
        ProgressEvent::Generating { .. } => {
            *active = Some(spinner("Generating summary..."));
        }
        ProgressEvent::Saved {
            output,
            summary_chars,
            ..
        } => {
            if color.enabled() {
                writeln!(w, "{} {}", "Summary saved to:".green(), output.display())?;
            } else {
                writeln!(w, "Summary saved to: {}", output.display())?;
            }
            writeln!(w, "Summary length: {} characters", summary_chars)?;
        }
        ProgressEvent::Skipped {
            path, chars, min, ..
        } => {
            let line = format!(
                "Skipped {}: not enough text (only {} characters, need {})",
                display_name(path),
                chars,
                min
            );
            if color.enabled() {
                writeln!(w, "{} {}", "WARNING:".yellow(), line)?;
            } else {
                writeln!(w, "WARNING: {}", line)?;
            }
        }
        ProgressEvent::Failed { path, message, .. } => {
            let line = format!("Error processing {}: {}", display_name(path), message);
            print_error(w, &line, color)?;
        }
    }
    Ok(())
}

/// Final tally after the batch.
pub fn print_report(
    w: &mut dyn Write,
    report: &BatchReport,
    output_dir: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(
            w,
            "Done: {} saved, {} skipped, {} failed",
            report.saved().to_string().green(),
            report.skipped().to_string().yellow(),
            report.failed().to_string().red()
        )?;
    } else {
        writeln!(
            w,
            "Done: {} saved, {} skipped, {} failed",
            report.saved(),
            report.skipped(),
            report.failed()
        )?;
    }
    writeln!(w, "Summaries are in {}", output_dir.display())?;
    Ok(())
}
