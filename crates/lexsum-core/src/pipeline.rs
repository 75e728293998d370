//! Turns extracted document text into a bounded encoder request, runs
//! generation and decodes the best beam.
//!
//! Steps:
//! 1. Cut the text to `max_input_chars` characters (a coarse cost guard; the
//!    character/token ratio varies, so this is not token-accurate)
//! 2. Tokenize and shape to exactly `encoder_max_len` ids, padding or
//!    truncating from the end, with a parallel attention mask
//! 3. Mark position 0 as the single globally attended token
//! 4. Place the request on the generator's device
//! 5. Generate with the configured decoding parameters
//! 6. Decode the best sequence without special tokens and trim it

use crate::generation::{GenerationConfig, GenerationError};
use crate::model::{Generator, ModelHandle, SummaryTokenizer};
use crate::{Device, Summary};

/// Model-ready encoder input for a single document (batch size 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub input_ids: Vec<u32>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<u32>,
    /// 1 only at index 0.
    pub global_attention_mask: Vec<u32>,
    pub device: Device,
}

impl GenerationRequest {
    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }

    /// Tensor shape as `[batch, seq_len]`.
    pub fn shape(&self) -> [usize; 2] {
        [1, self.seq_len()]
    }

    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }

    pub fn to_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}

/// Input bounds and decoding parameters for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizerConfig {
    pub max_input_chars: usize,
    pub encoder_max_len: usize,
    pub decoder_max_len: usize,
    /// Documents with fewer trimmed characters are skipped, not summarized.
    pub min_text_chars: usize,
    /// `max_length` is taken from `decoder_max_len`.
    pub generation: GenerationConfig,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 5000,
            encoder_max_len: 4096,
            decoder_max_len: 512,
            min_text_chars: 100,
            generation: GenerationConfig::default(),
        }
    }
}

impl SummarizerConfig {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            max_length: self.decoder_max_len,
            ..self.generation.clone()
        }
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn bound_input(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Pad or truncate `ids` to exactly `max_len` and build the attention mask.
///
/// When truncating, a trailing `eos` is kept as the last position so the
/// encoder still sees a terminated sequence.
pub fn fit_to_length(
    mut ids: Vec<u32>,
    max_len: usize,
    pad_id: u32,
    eos: Option<u32>,
) -> (Vec<u32>, Vec<u32>) {
    if ids.len() > max_len {
        let ends_with_eos = eos.is_some() && ids.last().copied() == eos;
        match eos {
            Some(eos) if ends_with_eos && max_len > 1 => {
                ids.truncate(max_len - 1);
                ids.push(eos);
            }
            _ => ids.truncate(max_len),
        }
    }
    let real = ids.len();
    ids.resize(max_len, pad_id);
    let mut mask = vec![1; real];
    mask.resize(max_len, 0);
    (ids, mask)
}

/// All zeros except index 0.
pub fn global_attention_mask(len: usize) -> Vec<u32> {
    let mut mask = vec![0; len];
    if let Some(first) = mask.first_mut() {
        *first = 1;
    }
    mask
}

/// Steps 1–3: bound, tokenize and shape `text` into an encoder request on
/// the CPU.
pub fn prepare_request(
    text: &str,
    tokenizer: &dyn SummaryTokenizer,
    config: &SummarizerConfig,
) -> Result<GenerationRequest, GenerationError> {
    if config.encoder_max_len == 0 {
        return Err(GenerationError::InvalidRequest(
            "encoder_max_len must be at least 1".into(),
        ));
    }
    let bounded = bound_input(text, config.max_input_chars);
    let ids = tokenizer.encode(bounded)?;
    let (input_ids, attention_mask) = fit_to_length(
        ids,
        config.encoder_max_len,
        tokenizer.pad_token_id(),
        tokenizer.eos_token_id(),
    );
    let global_attention_mask = global_attention_mask(input_ids.len());
    Ok(GenerationRequest {
        input_ids,
        attention_mask,
        global_attention_mask,
        device: Device::Cpu,
    })
}

/// Summarize `text` with an explicitly passed tokenizer and generator.
pub fn summarize(
    text: &str,
    tokenizer: &dyn SummaryTokenizer,
    generator: &dyn Generator,
    config: &SummarizerConfig,
) -> Result<Summary, GenerationError> {
    let request = prepare_request(text, tokenizer, config)?.to_device(generator.device());
    tracing::debug!(
        shape = ?request.shape(),
        real_tokens = request.real_tokens(),
        device = %request.device,
        "tokenized input"
    );

    let sequences = generator.generate(&request, &config.generation_config())?;
    let best = sequences.into_iter().next().ok_or(GenerationError::EmptyOutput)?;
    let decoded = tokenizer.decode(&best, true)?;

    Ok(Summary {
        text: decoded.trim().to_string(),
        generated_tokens: best.len(),
    })
}

impl ModelHandle {
    pub fn summarize(&self, text: &str, config: &SummarizerConfig) -> Result<Summary, GenerationError> {
        summarize(text, self.tokenizer(), self.generator(), config)
    }
}
