use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::SummarizerConfig;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model: Option<ModelSection>,
    pub generation: Option<GenerationSection>,
    pub input: Option<InputSection>,
    pub paths: Option<PathsSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSection {
    pub id: Option<String>,
    pub revision: Option<String>,
    pub cache_dir: Option<String>,
    pub onnx_dir: Option<String>,
    pub device: Option<String>,
    pub intra_threads: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    pub num_beams: Option<usize>,
    pub min_length: Option<usize>,
    pub no_repeat_ngram_size: Option<usize>,
    pub repetition_penalty: Option<f32>,
    pub length_penalty: Option<f32>,
    pub early_stopping: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSection {
    pub max_chars: Option<usize>,
    pub min_text_chars: Option<usize>,
    pub encoder_max_len: Option<usize>,
    pub decoder_max_len: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsSection {
    pub input_dir: Option<String>,
    pub output_dir: Option<String>,
}

/// Platform config directory path: `<config_dir>/lexsum/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lexsum").join("config.toml"))
}

/// Load config by cascading CWD `.lexsum.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".lexsum.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

fn pick<S, T>(
    overlay: &Option<S>,
    base: &Option<S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (om, bm) = (&overlay.model, &base.model);
    let (og, bg) = (&overlay.generation, &base.generation);
    let (oi, bi) = (&overlay.input, &base.input);
    let (op, bp) = (&overlay.paths, &base.paths);
    ConfigFile {
        model: Some(ModelSection {
            id: pick(om, bm, |m| m.id.clone()),
            revision: pick(om, bm, |m| m.revision.clone()),
            cache_dir: pick(om, bm, |m| m.cache_dir.clone()),
            onnx_dir: pick(om, bm, |m| m.onnx_dir.clone()),
            device: pick(om, bm, |m| m.device.clone()),
            intra_threads: pick(om, bm, |m| m.intra_threads),
        }),
        generation: Some(GenerationSection {
            num_beams: pick(og, bg, |g| g.num_beams),
            min_length: pick(og, bg, |g| g.min_length),
            no_repeat_ngram_size: pick(og, bg, |g| g.no_repeat_ngram_size),
            repetition_penalty: pick(og, bg, |g| g.repetition_penalty),
            length_penalty: pick(og, bg, |g| g.length_penalty),
            early_stopping: pick(og, bg, |g| g.early_stopping),
        }),
        input: Some(InputSection {
            max_chars: pick(oi, bi, |i| i.max_chars),
            min_text_chars: pick(oi, bi, |i| i.min_text_chars),
            encoder_max_len: pick(oi, bi, |i| i.encoder_max_len),
            decoder_max_len: pick(oi, bi, |i| i.decoder_max_len),
        }),
        paths: Some(PathsSection {
            input_dir: pick(op, bp, |p| p.input_dir.clone()),
            output_dir: pick(op, bp, |p| p.output_dir.clone()),
        }),
    }
}

impl ConfigFile {
    /// Summarizer settings with every value absent from the file left at
    /// its default.
    pub fn summarizer_config(&self) -> SummarizerConfig {
        let mut config = SummarizerConfig::default();
        if let Some(input) = &self.input {
            if let Some(v) = input.max_chars {
                config.max_input_chars = v;
            }
            if let Some(v) = input.min_text_chars {
                config.min_text_chars = v;
            }
            if let Some(v) = input.encoder_max_len {
                config.encoder_max_len = v;
            }
            if let Some(v) = input.decoder_max_len {
                config.decoder_max_len = v;
            }
        }
        if let Some(g) = &self.generation {
            let gen_config = &mut config.generation;
            if let Some(v) = g.num_beams {
                gen_config.num_beams = v;
            }
            if let Some(v) = g.min_length {
                gen_config.min_length = v;
            }
            if let Some(v) = g.no_repeat_ngram_size {
                gen_config.no_repeat_ngram_size = v;
            }
            if let Some(v) = g.repetition_penalty {
                gen_config.repetition_penalty = v;
            }
            if let Some(v) = g.length_penalty {
                gen_config.length_penalty = v;
            }
            if let Some(v) = g.early_stopping {
                gen_config.early_stopping = v;
            }
        }
        config
    }
}
