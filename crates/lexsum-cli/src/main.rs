use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexsum_core::{BatchRunner, ModelProvider, config_file, discover_pdfs};
use lexsum_onnx::HubModelProvider;
use lexsum_pdf_mupdf::MupdfBackend;

mod output;
mod prompt;
mod settings;

use output::ColorMode;
use settings::Settings;

/// Summarize long legal PDFs with an LED encoder-decoder model.
///
/// Without arguments, asks for a PDF path or lists the PDFs in the input
/// folder and asks which to summarize.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// PDF files to summarize (skips the interactive prompt)
    pub paths: Vec<PathBuf>,

    /// Summarize every PDF in the input folder without prompting
    #[arg(long, conflicts_with = "paths")]
    pub all: bool,

    /// Folder scanned for PDFs [default: input_pdfs]
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Folder summaries are written to [default: output_summaries]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Hugging Face Hub repo id or local model directory
    #[arg(long)]
    pub model: Option<String>,

    /// Hub revision (branch, tag or commit)
    #[arg(long)]
    pub revision: Option<String>,

    /// auto, cpu, cuda or cuda:N
    #[arg(long)]
    pub device: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Debug logging to stderr (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,lexsum=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::resolve(&cli, &config_file::load_config(), |key| {
        std::env::var(key).ok()
    })?;
    let color = ColorMode(!cli.no_color);
    let mut out = std::io::stdout();

    output::print_banner(&mut out, color)?;

    let Some(files) = select_files(&cli, &settings, &mut out, color)? else {
        return Ok(());
    };

    let bar = output::spinner(format!("Loading model {}...", settings.model_id));
    let provider = HubModelProvider::new(settings.provider.clone());
    let handle = match provider.resolve(&settings.model_id) {
        Ok(handle) => {
            bar.finish_and_clear();
            handle
        }
        Err(e) => {
            bar.finish_and_clear();
            output::print_error(&mut out, &format!("Failed to load model: {}", e), color)?;
            anyhow::bail!("model '{}' could not be loaded", settings.model_id);
        }
    };
    output::print_model_loaded(&mut out, handle.model_id(), &handle.device().to_string(), color)?;

    let backend = MupdfBackend::new();
    let runner = BatchRunner::new(&backend, &handle, &settings.summarizer, &settings.output_dir);

    let mut active = None;
    let report = runner.run(&files, |event| {
        let _ = output::print_progress(&mut out, &event, &mut active, color);
        let _ = out.flush();
    })?;
    if let Some(bar) = active.take() {
        bar.finish_and_clear();
    }

    output::print_report(&mut out, &report, runner.output_dir(), color)?;
    Ok(())
}

/// Decide which PDFs to process. `None` ends the run after a message was
/// printed (nothing found, bad path or bad selection).
fn select_files(
    cli: &Cli,
    settings: &Settings,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<Option<Vec<PathBuf>>> {
    if !cli.paths.is_empty() {
        if let Some(missing) = cli.paths.iter().find(|p| !p.exists()) {
            output::print_error(out, &format!("File not found: {}", missing.display()), color)?;
            return Ok(None);
        }
        return Ok(Some(cli.paths.clone()));
    }

    if !cli.all {
        let answer = prompt::ask(&format!(
            "Enter PDF file path (or drag file here) [default: {}]: ",
            settings.input_dir.display()
        ))?;
        let cleaned = prompt::clean_path_input(&answer);
        if !cleaned.is_empty() {
            let path = PathBuf::from(cleaned);
            if !path.exists() {
                output::print_error(out, &format!("File not found: {}", path.display()), color)?;
                return Ok(None);
            }
            return Ok(Some(vec![path]));
        }
    }

    let pdfs = match discover_pdfs(&settings.input_dir) {
        Ok(pdfs) => pdfs,
        Err(e) => {
            tracing::debug!(dir = %settings.input_dir.display(), error = %e, "cannot read input folder");
            Vec::new()
        }
    };
    if pdfs.is_empty() {
        output::print_error(
            out,
            &format!(
                "No PDF files found in {}. Please add PDF files or specify a path.",
                settings.input_dir.display()
            ),
            color,
        )?;
        return Ok(None);
    }
    if cli.all {
        return Ok(Some(pdfs));
    }

    output::print_found_files(out, &settings.input_dir, &pdfs, color)?;
    let answer = prompt::ask("Enter number to summarize (or 'all'): ")?;
    match prompt::parse_selection(&answer, pdfs.len()) {
        Some(selection) => Ok(Some(selection.apply(&pdfs))),
        None => {
            output::print_error(out, "Invalid selection", color)?;
            Ok(None)
        }
    }
}
