//! [`SummaryTokenizer`] on top of the `tokenizers` crate.
//!
//! Checkpoints that ship only `vocab.json` + `merges.txt` (the older
//! RoBERTa/BART layout) get an equivalent tokenizer definition written as
//! JSON and loaded through the same path as a `tokenizer.json`.

use std::path::Path;

use serde_json::{Map, Value, json};
use tokenizers::Tokenizer;

use lexsum_core::{GenerationError, ModelLoadError, SummaryTokenizer};

pub struct HfTokenizer {
    inner: Tokenizer,
    pad_token_id: u32,
    eos_token_id: Option<u32>,
}

impl HfTokenizer {
    /// Wraps `inner`, turning off any padding or truncation baked into its
    /// definition; the pipeline shapes sequences itself.
    pub fn new(
        mut inner: Tokenizer,
        pad_token_id: u32,
        eos_token_id: Option<u32>,
    ) -> Result<Self, ModelLoadError> {
        inner.with_padding(None);
        inner
            .with_truncation(None)
            .map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;
        Ok(Self {
            inner,
            pad_token_id,
            eos_token_id,
        })
    }

    pub fn from_file(
        path: &Path,
        pad_token_id: u32,
        eos_token_id: Option<u32>,
    ) -> Result<Self, ModelLoadError> {
        let inner = Tokenizer::from_file(path).map_err(|e| {
            ModelLoadError::Tokenizer(format!("cannot load '{}': {}", path.display(), e))
        })?;
        Self::new(inner, pad_token_id, eos_token_id)
    }

    /// Builds a byte-level BPE tokenizer with `<s> … </s>` post-processing.
    pub fn from_bpe_files(
        vocab_path: &Path,
        merges_path: &Path,
        pad_token_id: u32,
        eos_token_id: Option<u32>,
    ) -> Result<Self, ModelLoadError> {
        let vocab: Map<String, Value> = serde_json::from_str(&std::fs::read_to_string(vocab_path)?)
            .map_err(|e| {
                ModelLoadError::Tokenizer(format!("cannot parse '{}': {}", vocab_path.display(), e))
            })?;
        let merges = parse_merges(&std::fs::read_to_string(merges_path)?);
        let definition = byte_level_bpe_json(vocab, merges)?;
        let inner: Tokenizer = definition
            .to_string()
            .parse()
            .map_err(|e| ModelLoadError::Tokenizer(format!("invalid BPE definition: {}", e)))?;
        tracing::debug!(
            vocab = %vocab_path.display(),
            "built byte-level BPE tokenizer from vocab and merges"
        );
        Self::new(inner, pad_token_id, eos_token_id)
    }
}

impl SummaryTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, GenerationError> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| GenerationError::Tokenization(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String, GenerationError> {
        self.inner
            .decode(ids, skip_special_tokens)
            .map_err(|e| GenerationError::Tokenization(e.to_string()))
    }

    fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    fn eos_token_id(&self) -> Option<u32> {
        self.eos_token_id
    }
}

/// Merge rules from a `merges.txt`, skipping the `#version` header and
/// blank lines.
pub fn parse_merges(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.starts_with("#version") && !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

const SPECIAL_TOKENS: [&str; 5] = ["<s>", "<pad>", "</s>", "<unk>", "<mask>"];

/// Tokenizer definition in the `tokenizer.json` format for a RoBERTa-style
/// byte-level BPE. `<s>` and `</s>` must be in the vocabulary.
pub fn byte_level_bpe_json(
    vocab: Map<String, Value>,
    merges: Vec<String>,
) -> Result<Value, ModelLoadError> {
    let id_of = |token: &str| vocab.get(token).and_then(Value::as_u64);
    let bos = id_of("<s>")
        .ok_or_else(|| ModelLoadError::Tokenizer("vocabulary has no <s> token".into()))?;
    let eos = id_of("</s>")
        .ok_or_else(|| ModelLoadError::Tokenizer("vocabulary has no </s> token".into()))?;

    let added_tokens: Vec<Value> = SPECIAL_TOKENS
        .iter()
        .filter_map(|token| {
            id_of(token).map(|id| {
                json!({
                    "id": id,
                    "content": token,
                    "single_word": false,
                    "lstrip": *token == "<mask>",
                    "rstrip": false,
                    "normalized": false,
                    "special": true
                })
            })
        })
        .collect();
    let unk_token = if vocab.contains_key("<unk>") {
        json!("<unk>")
    } else {
        Value::Null
    };

    Ok(json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": null,
        "pre_tokenizer": {
            "type": "ByteLevel",
            "add_prefix_space": false,
            "trim_offsets": true,
            "use_regex": true
        },
        "post_processor": {
            "type": "RobertaProcessing",
            "sep": ["</s>", eos],
            "cls": ["<s>", bos],
            "trim_offsets": true,
            "add_prefix_space": false
        },
        "decoder": {
            "type": "ByteLevel",
            "add_prefix_space": true,
            "trim_offsets": true,
            "use_regex": true
        },
        "model": {
            "type": "BPE",
            "dropout": null,
            "unk_token": unk_token,
            "continuing_subword_prefix": "",
            "end_of_word_suffix": "",
            "fuse_unk": false,
            "byte_fallback": false,
            "vocab": vocab,
            "merges": merges
        }
    }))
}
