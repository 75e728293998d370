//! Fakes shared by the integration tests: a character-level tokenizer and a
//! step model that tries to copy its input, so the real beam search runs
//! without any model files.

#![allow(dead_code)]

use std::sync::Mutex;

use lexsum_core::generation::{BeamSearch, Seq2SeqModel};
use lexsum_core::{
    Device, GenerationConfig, GenerationError, GenerationRequest, Generator, ModelHandle,
    SpecialTokens, SummaryTokenizer,
};

pub const BOS: u32 = 0;
pub const PAD: u32 = 1;
pub const EOS: u32 = 2;
const OFFSET: u32 = 4;
pub const VOCAB: usize = 256 + OFFSET as usize;

/// One token per character (Latin-1 range), wrapped in `<s> … </s>`.
pub struct CharTokenizer;

impl SummaryTokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, GenerationError> {
        let mut ids = vec![BOS];
        for c in text.chars() {
            let code = c as u32;
            if code >= 256 {
                return Err(GenerationError::Tokenization(format!("unsupported char {:?}", c)));
            }
            ids.push(code + OFFSET);
        }
        ids.push(EOS);
        Ok(ids)
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String, GenerationError> {
        let mut out = String::new();
        for &id in ids {
            if id < OFFSET {
                if !skip_special_tokens {
                    out.push_str(&format!("<{}>", id));
                }
                continue;
            }
            out.push(char::from_u32(id - OFFSET).unwrap_or('?'));
        }
        Ok(out)
    }

    fn pad_token_id(&self) -> u32 {
        PAD
    }

    fn eos_token_id(&self) -> Option<u32> {
        Some(EOS)
    }
}

pub fn special_tokens() -> SpecialTokens {
    SpecialTokens {
        decoder_start_token_id: EOS,
        eos_token_id: EOS,
        pad_token_id: PAD,
        forced_bos_token_id: Some(BOS),
    }
}

/// Prefers emitting the encoder token at the same position, with the next
/// token id as a runner-up.
pub struct EchoModel {
    pub device: Device,
}

impl Seq2SeqModel for EchoModel {
    type Encoded = Vec<u32>;

    fn device(&self) -> Device {
        self.device
    }

    fn encode(&self, request: &GenerationRequest) -> Result<Vec<u32>, GenerationError> {
        Ok(request
            .input_ids
            .iter()
            .zip(&request.attention_mask)
            .filter(|(_, m)| **m == 1)
            .map(|(id, _)| *id)
            .collect())
    }

    fn next_token_logits(
        &self,
        encoded: &Vec<u32>,
        prefixes: &[&[u32]],
    ) -> Result<Vec<Vec<f32>>, GenerationError> {
        Ok(prefixes
            .iter()
            .map(|prefix| {
                let target = encoded.get(prefix.len() - 1).copied().unwrap_or(EOS) as usize;
                let mut row = vec![0.0; VOCAB];
                row[(target + 1) % VOCAB] = 4.0;
                row[EOS as usize] = 2.0;
                row[target] = 8.0;
                row
            })
            .collect())
    }
}

pub fn echo_handle(device: Device) -> ModelHandle {
    ModelHandle::new(
        "test/echo",
        Box::new(CharTokenizer),
        Box::new(BeamSearch::new(EchoModel { device }, special_tokens())),
    )
}

/// Records the last request and returns a fixed sequence.
pub struct RecordingGenerator {
    pub device: Device,
    pub output: Vec<u32>,
    pub seen: Mutex<Option<(GenerationRequest, GenerationConfig)>>,
}

impl RecordingGenerator {
    pub fn new(device: Device, output: Vec<u32>) -> Self {
        Self {
            device,
            output,
            seen: Mutex::new(None),
        }
    }
}

impl Generator for RecordingGenerator {
    fn device(&self) -> Device {
        self.device
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        config: &GenerationConfig,
    ) -> Result<Vec<Vec<u32>>, GenerationError> {
        *self.seen.lock().unwrap() = Some((request.clone(), config.clone()));
        Ok(vec![self.output.clone()])
    }
}

pub struct FailingGenerator;

impl Generator for FailingGenerator {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn generate(
        &self,
        _request: &GenerationRequest,
        _config: &GenerationConfig,
    ) -> Result<Vec<Vec<u32>>, GenerationError> {
        Err(GenerationError::Inference("out of memory".into()))
    }
}

/// Token ids for `text` without the wrapping special tokens.
pub fn char_ids(text: &str) -> Vec<u32> {
    text.chars().map(|c| c as u32 + OFFSET).collect()
}
