use std::fmt;

pub mod backend;
pub mod batch;
pub mod config_file;
pub mod extract;
pub mod generation;
pub mod model;
pub mod pipeline;

pub use backend::{ExtractionError, PdfBackend};
pub use batch::{
    BatchReport, BatchRunner, DocumentError, DocumentOutcome, ProgressEvent, discover_pdfs,
    summary_path,
};
pub use extract::extract_text;
pub use generation::{GenerationConfig, GenerationError, SpecialTokens};
pub use model::{Generator, ModelHandle, ModelLoadError, ModelProvider, SummaryTokenizer};
pub use pipeline::{GenerationRequest, SummarizerConfig, prepare_request, summarize};

/// Default pretrained model: an LED checkpoint fine-tuned on legal case text.
pub const DEFAULT_MODEL_ID: &str = "nsi319/legal-led-base-16384";

/// Text extracted from a PDF, one block per non-blank page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    /// Kept page texts joined with `"\n"`, in page order.
    pub text: String,
    pub pages_total: usize,
    pub pages_kept: usize,
}

impl ExtractedText {
    /// Number of characters left after trimming surrounding whitespace.
    pub fn meaningful_chars(&self) -> usize {
        self.text.trim().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A decoded summary for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    /// Length of the best beam in decoder tokens, including special tokens.
    pub generated_tokens: usize,
}

/// Compute device that model tensors live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda {
        ordinal: usize,
    },
}

impl Device {
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Cuda { .. })
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda { ordinal } => write!(f, "cuda:{}", ordinal),
        }
    }
}

/// Which device the user asked for. `Auto` prefers an accelerator when one
/// is compiled in and present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "" | "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda(0)),
            other => {
                let ordinal = other
                    .strip_prefix("cuda:")
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| format!("unknown device '{}' (expected auto, cpu, cuda or cuda:N)", other))?;
                Ok(DevicePreference::Cuda(ordinal))
            }
        }
    }
}
