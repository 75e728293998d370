use std::path::PathBuf;

use lexsum_core::config_file::ConfigFile;
use lexsum_core::{DEFAULT_MODEL_ID, DevicePreference, SummarizerConfig};
use lexsum_onnx::ProviderOptions;

use crate::Cli;

pub const DEFAULT_INPUT_DIR: &str = "input_pdfs";
pub const DEFAULT_OUTPUT_DIR: &str = "output_summaries";

/// Everything a run needs, resolved from flags > env vars > config file >
/// defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model_id: String,
    pub provider: ProviderOptions,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub summarizer: SummarizerConfig,
}

impl Settings {
    pub fn resolve(
        cli: &Cli,
        file: &ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let model = file.model.clone().unwrap_or_default();
        let paths = file.paths.clone().unwrap_or_default();

        let model_id = cli
            .model
            .clone()
            .or_else(|| env("LEXSUM_MODEL"))
            .or(model.id)
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());

        let device = match cli
            .device
            .clone()
            .or_else(|| env("LEXSUM_DEVICE"))
            .or(model.device)
        {
            Some(raw) => raw
                .parse::<DevicePreference>()
                .map_err(|e| anyhow::anyhow!(e))?,
            None => DevicePreference::Auto,
        };

        let defaults = ProviderOptions::default();
        let provider = ProviderOptions {
            revision: cli.revision.clone().or(model.revision),
            cache_dir: model.cache_dir.map(PathBuf::from),
            onnx_dir: model.onnx_dir.unwrap_or(defaults.onnx_dir),
            device,
            intra_threads: model.intra_threads,
            show_progress: true,
        };

        let input_dir = cli
            .input_dir
            .clone()
            .or_else(|| env("LEXSUM_INPUT_DIR").map(PathBuf::from))
            .or(paths.input_dir.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR));
        let output_dir = cli
            .output_dir
            .clone()
            .or_else(|| env("LEXSUM_OUTPUT_DIR").map(PathBuf::from))
            .or(paths.output_dir.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let summarizer = file.summarizer_config();
        summarizer
            .generation_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [generation] settings: {}", e))?;

        Ok(Self {
            model_id,
            provider,
            input_dir,
            output_dir,
            summarizer,
        })
    }
}
