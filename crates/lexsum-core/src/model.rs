use thiserror::Error;

use crate::Device;
use crate::generation::{GenerationConfig, GenerationError};
use crate::pipeline::GenerationRequest;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("model '{0}' could not be resolved")]
    NotFound(String),
    #[error("failed to fetch {file}: {message}")]
    Download { file: String, message: String },
    #[error("model files incomplete: {0}")]
    MissingFile(String),
    #[error("invalid model config: {0}")]
    InvalidConfig(String),
    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),
    #[error("failed to initialize inference session: {0}")]
    Runtime(String),
    #[error("requested device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts text to token ids and back.
pub trait SummaryTokenizer: Send + Sync {
    /// Encode `text` with the model's special tokens added. No truncation or
    /// padding is applied here.
    fn encode(&self, text: &str) -> Result<Vec<u32>, GenerationError>;

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String, GenerationError>;

    fn pad_token_id(&self) -> u32;

    /// End-of-sequence token appended by `encode`, if the tokenizer adds one.
    fn eos_token_id(&self) -> Option<u32>;
}

/// Conditional text generation over a prepared encoder request.
pub trait Generator: Send + Sync {
    /// Device the model parameters live on.
    fn device(&self) -> Device;

    /// Run generation and return the output sequences, best first.
    fn generate(
        &self,
        request: &GenerationRequest,
        config: &GenerationConfig,
    ) -> Result<Vec<Vec<u32>>, GenerationError>;
}

/// A tokenizer and generator loaded once per run and shared read-only by
/// every document.
pub struct ModelHandle {
    model_id: String,
    tokenizer: Box<dyn SummaryTokenizer>,
    generator: Box<dyn Generator>,
}

impl ModelHandle {
    pub fn new(
        model_id: impl Into<String>,
        tokenizer: Box<dyn SummaryTokenizer>,
        generator: Box<dyn Generator>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            tokenizer,
            generator,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn tokenizer(&self) -> &dyn SummaryTokenizer {
        self.tokenizer.as_ref()
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn device(&self) -> Device {
        self.generator.device()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model_id", &self.model_id)
            .field("device", &self.device())
            .finish_non_exhaustive()
    }
}

/// Factory resolving a model identifier into a ready-to-use handle.
pub trait ModelProvider {
    fn resolve(&self, identifier: &str) -> Result<ModelHandle, ModelLoadError>;
}
