//! The subset of a Hugging Face `config.json` the decoder loop needs.

use std::path::Path;

use serde::Deserialize;

use lexsum_core::{ModelLoadError, SpecialTokens};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedConfig {
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub decoder_start_token_id: Option<u32>,
    #[serde(default)]
    pub eos_token_id: Option<u32>,
    #[serde(default)]
    pub pad_token_id: Option<u32>,
    #[serde(default)]
    pub bos_token_id: Option<u32>,
    #[serde(default)]
    pub forced_bos_token_id: Option<u32>,
    #[serde(default)]
    pub max_encoder_position_embeddings: Option<usize>,
}

impl LedConfig {
    pub fn parse(json: &str) -> Result<Self, ModelLoadError> {
        serde_json::from_str(json).map_err(|e| ModelLoadError::InvalidConfig(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ModelLoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Special token ids for generation. The decoder start token falls back
    /// to end-of-sequence, as BART-family models do.
    pub fn special_tokens(&self) -> Result<SpecialTokens, ModelLoadError> {
        let eos_token_id = self
            .eos_token_id
            .ok_or_else(|| ModelLoadError::InvalidConfig("eos_token_id is missing".into()))?;
        let pad_token_id = self
            .pad_token_id
            .ok_or_else(|| ModelLoadError::InvalidConfig("pad_token_id is missing".into()))?;
        Ok(SpecialTokens {
            decoder_start_token_id: self.decoder_start_token_id.unwrap_or(eos_token_id),
            eos_token_id,
            pad_token_id,
            forced_bos_token_id: self.forced_bos_token_id,
        })
    }
}
