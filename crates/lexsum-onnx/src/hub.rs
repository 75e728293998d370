use std::path::{Path, PathBuf};

use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};

use lexsum_core::generation::BeamSearch;
use lexsum_core::{Device, DevicePreference, ModelHandle, ModelLoadError, ModelProvider};

use crate::led::{LedOnnx, SessionOptions};
use crate::model_config::LedConfig;
use crate::tokenizer::HfTokenizer;

pub const DEFAULT_ONNX_DIR: &str = "onnx";
const ENCODER_FILE: &str = "encoder_model.onnx";
const DECODER_FILE: &str = "decoder_model.onnx";

/// Settings for resolving a model identifier.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Hub revision (branch, tag or commit). `None` means `main`.
    pub revision: Option<String>,
    /// Hub cache directory. `None` uses `HF_HOME` or the platform default.
    pub cache_dir: Option<PathBuf>,
    /// Subdirectory holding the ONNX graphs; the repo root is tried next.
    pub onnx_dir: String,
    pub device: DevicePreference,
    pub intra_threads: Option<usize>,
    /// Show hf-hub download progress bars.
    pub show_progress: bool,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            revision: None,
            cache_dir: None,
            onnx_dir: DEFAULT_ONNX_DIR.to_string(),
            device: DevicePreference::Auto,
            intra_threads: None,
            show_progress: true,
        }
    }
}

/// Resolves local directories and Hugging Face Hub repo ids into a
/// [`ModelHandle`] backed by ONNX Runtime.
#[derive(Debug, Clone, Default)]
pub struct HubModelProvider {
    options: ProviderOptions,
}

impl HubModelProvider {
    pub fn new(options: ProviderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    fn source(&self, identifier: &str) -> Result<ModelSource, ModelLoadError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ModelLoadError::NotFound("empty model identifier".into()));
        }
        let local = Path::new(identifier);
        if local.is_dir() {
            tracing::debug!(dir = %local.display(), "using local model directory");
            return Ok(ModelSource::Local(local.to_path_buf()));
        }
        if local.is_absolute() || identifier.starts_with('.') || identifier.split('/').count() > 2
        {
            return Err(ModelLoadError::NotFound(format!(
                "'{}' is neither a directory nor a Hub repo id",
                identifier
            )));
        }

        let mut builder = ApiBuilder::new().with_progress(self.options.show_progress);
        if let Some(cache_dir) = &self.options.cache_dir {
            builder = builder.with_cache_dir(cache_dir.clone());
        }
        let api = builder.build().map_err(|e| ModelLoadError::Download {
            file: identifier.to_string(),
            message: e.to_string(),
        })?;
        let repo = match &self.options.revision {
            Some(revision) => {
                Repo::with_revision(identifier.to_string(), RepoType::Model, revision.clone())
            }
            None => Repo::model(identifier.to_string()),
        };
        tracing::debug!(repo = identifier, revision = ?self.options.revision, "using Hub repo");
        Ok(ModelSource::Hub(api.repo(repo)))
    }

    /// ONNX graph `file` under the configured ONNX directory, else at the root.
    fn graph(&self, source: &ModelSource, file: &str) -> Result<PathBuf, ModelLoadError> {
        let nested = format!("{}/{}", self.options.onnx_dir.trim_end_matches('/'), file);
        if let Some(path) = source.try_fetch(&nested) {
            return Ok(path);
        }
        source.try_fetch(file).ok_or_else(|| {
            ModelLoadError::MissingFile(format!(
                "{} (looked for '{}' and '{}'; export the model to ONNX first)",
                file, nested, file
            ))
        })
    }

    fn tokenizer(
        &self,
        source: &ModelSource,
        config: &LedConfig,
    ) -> Result<HfTokenizer, ModelLoadError> {
        let special = config.special_tokens()?;
        let eos = Some(special.eos_token_id);
        if let Some(path) = source.try_fetch("tokenizer.json") {
            return HfTokenizer::from_file(&path, special.pad_token_id, eos);
        }
        let vocab = source.fetch("vocab.json")?;
        let merges = source.fetch("merges.txt")?;
        HfTokenizer::from_bpe_files(&vocab, &merges, special.pad_token_id, eos)
    }
}

impl ModelProvider for HubModelProvider {
    fn resolve(&self, identifier: &str) -> Result<ModelHandle, ModelLoadError> {
        let source = self.source(identifier)?;

        let config = LedConfig::from_file(&source.fetch("config.json")?)?;
        if let Some(model_type) = config.model_type.as_deref()
            && model_type != "led"
        {
            tracing::warn!(model_type, "model is not an LED checkpoint; generation may misbehave");
        }
        let special = config.special_tokens()?;
        let tokenizer = self.tokenizer(&source, &config)?;
        let encoder_path = self.graph(&source, ENCODER_FILE)?;
        let decoder_path = self.graph(&source, DECODER_FILE)?;

        let device = resolve_device(self.options.device)?;
        let model = LedOnnx::load(
            &encoder_path,
            &decoder_path,
            SessionOptions {
                device,
                intra_threads: self.options.intra_threads,
            },
        )?;
        tracing::info!(model = identifier, %device, "model ready");

        Ok(ModelHandle::new(
            identifier.trim(),
            Box::new(tokenizer),
            Box::new(BeamSearch::new(model, special)),
        ))
    }
}

enum ModelSource {
    Local(PathBuf),
    Hub(ApiRepo),
}

impl ModelSource {
    fn fetch(&self, file: &str) -> Result<PathBuf, ModelLoadError> {
        match self {
            ModelSource::Local(dir) => {
                let path = dir.join(file);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(ModelLoadError::MissingFile(format!(
                        "{} in {}",
                        file,
                        dir.display()
                    )))
                }
            }
            ModelSource::Hub(repo) => repo.get(file).map_err(|e| ModelLoadError::Download {
                file: file.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn try_fetch(&self, file: &str) -> Option<PathBuf> {
        match self.fetch(file) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!(file, error = %e, "optional model file unavailable");
                None
            }
        }
    }
}

#[cfg(feature = "cuda")]
fn cuda_available() -> bool {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

    CUDAExecutionProvider::default().is_available().unwrap_or(false)
}

#[cfg(not(feature = "cuda"))]
fn cuda_available() -> bool {
    false
}

/// Maps the requested device onto what this build and machine offer.
pub fn resolve_device(preference: DevicePreference) -> Result<Device, ModelLoadError> {
    match preference {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Auto if cuda_available() => Ok(Device::Cuda { ordinal: 0 }),
        DevicePreference::Auto => Ok(Device::Cpu),
        DevicePreference::Cuda(ordinal) if cuda_available() => Ok(Device::Cuda { ordinal }),
        DevicePreference::Cuda(ordinal) => Err(ModelLoadError::DeviceUnavailable(format!(
            "cuda:{} (no CUDA execution provider available)",
            ordinal
        ))),
    }
}
