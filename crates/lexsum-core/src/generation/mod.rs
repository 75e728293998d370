//! Beam-search generation for encoder-decoder models.
//!
//! The search itself is model-agnostic: a backend only has to implement
//! [`Seq2SeqModel`], i.e. run the encoder once and return next-token logits
//! for a set of decoder prefixes. Wrapping such a model in [`BeamSearch`]
//! yields a [`crate::Generator`].

use thiserror::Error;

use crate::Device;
use crate::pipeline::GenerationRequest;

pub mod beam;
pub mod processors;

pub use beam::{BeamSearch, Hypothesis};
pub use processors::LogitsProcessor;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("tokenization failed: {0}")]
    Tokenization(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),
    #[error("model produced no output sequence")]
    EmptyOutput,
}

/// Decoding parameters passed to the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub num_beams: usize,
    /// Maximum decoder sequence length, decoder start token included.
    pub max_length: usize,
    /// End-of-sequence is banned until the sequence is at least this long.
    pub min_length: usize,
    /// 0 disables the n-gram ban.
    pub no_repeat_ngram_size: usize,
    /// 1.0 disables the penalty.
    pub repetition_penalty: f32,
    pub length_penalty: f32,
    /// Stop as soon as `num_beams` finished hypotheses exist.
    pub early_stopping: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_beams: 2,
            max_length: 512,
            min_length: 128,
            no_repeat_ngram_size: 4,
            repetition_penalty: 2.5,
            length_penalty: 1.0,
            early_stopping: true,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.num_beams == 0 {
            return Err(GenerationError::InvalidConfig("num_beams must be at least 1".into()));
        }
        if self.max_length < 2 {
            return Err(GenerationError::InvalidConfig("max_length must be at least 2".into()));
        }
        if self.min_length > self.max_length {
            return Err(GenerationError::InvalidConfig(format!(
                "min_length ({}) exceeds max_length ({})",
                self.min_length, self.max_length
            )));
        }
        if !(self.repetition_penalty > 0.0) {
            return Err(GenerationError::InvalidConfig(
                "repetition_penalty must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Token ids the decoder loop needs to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
    /// Token forced right after the decoder start token, if any.
    pub forced_bos_token_id: Option<u32>,
}

/// An encoder-decoder model exposed one decoding step at a time.
///
/// There is no key/value cache: every call receives the full decoder
/// prefixes and must return the logits for the position after the last
/// token of each.
pub trait Seq2SeqModel: Send + Sync {
    type Encoded;

    fn device(&self) -> Device;

    fn encode(&self, request: &GenerationRequest) -> Result<Self::Encoded, GenerationError>;

    /// One row of vocabulary logits per entry of `prefixes`, in order.
    fn next_token_logits(
        &self,
        encoded: &Self::Encoded,
        prefixes: &[&[u32]],
    ) -> Result<Vec<Vec<f32>>, GenerationError>;
}
