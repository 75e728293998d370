//! ONNX Runtime backend for lexsum: LED encoder/decoder sessions, a
//! `tokenizers`-backed tokenizer, and a model provider that fetches both
//! from a local directory or the Hugging Face Hub.

pub mod hub;
pub mod led;
pub mod model_config;
pub mod tokenizer;

pub use hub::{HubModelProvider, ProviderOptions, resolve_device};
pub use led::{LedOnnx, SessionOptions};
pub use model_config::LedConfig;
pub use tokenizer::HfTokenizer;
