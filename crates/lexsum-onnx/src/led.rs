//! LED encoder/decoder graphs run through ONNX Runtime.
//!
//! Expected graph signatures (the layout produced by a standard seq2seq ONNX
//! export without past key/values):
//!
//! - encoder: `input_ids`, `attention_mask`, `global_attention_mask`
//!   → `last_hidden_state` `[batch, seq, hidden]`
//! - decoder: `input_ids`, `encoder_attention_mask`, `encoder_hidden_states`
//!   → `logits` `[batch, target_len, vocab]`

use std::path::Path;
use std::sync::Mutex;

use ort::session::{Session, builder::GraphOptimizationLevel, builder::SessionBuilder};
use ort::value::{DynValue, Tensor};

use lexsum_core::generation::Seq2SeqModel;
use lexsum_core::{Device, GenerationError, GenerationRequest, ModelLoadError};

/// Session settings shared by the encoder and decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub device: Device,
    pub intra_threads: Option<usize>,
}

/// Encoder output for one document, kept on the host between decoder steps.
#[derive(Debug, Clone)]
pub struct EncoderState {
    hidden: Vec<f32>,
    attention_mask: Vec<i64>,
    seq_len: usize,
    hidden_size: usize,
}

impl EncoderState {
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

pub struct LedOnnx {
    // `Session::run` needs `&mut`; runs are serial so the locks never contend.
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    device: Device,
}

impl LedOnnx {
    pub fn load(
        encoder_path: &Path,
        decoder_path: &Path,
        options: SessionOptions,
    ) -> Result<Self, ModelLoadError> {
        tracing::info!(
            encoder = %encoder_path.display(),
            decoder = %decoder_path.display(),
            device = %options.device,
            "loading LED ONNX sessions"
        );
        let encoder = build_session(encoder_path, options)?;
        let decoder = build_session(decoder_path, options)?;
        Ok(Self {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            device: options.device,
        })
    }
}

fn build_session(path: &Path, options: SessionOptions) -> Result<Session, ModelLoadError> {
    let runtime = |e: ort::Error| ModelLoadError::Runtime(format!("{}: {}", path.display(), e));
    let mut builder = Session::builder()
        .map_err(runtime)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(runtime)?;
    if let Some(threads) = options.intra_threads {
        builder = builder.with_intra_threads(threads).map_err(runtime)?;
    }
    builder = with_device(builder, options.device)?;
    builder.commit_from_file(path).map_err(runtime)
}

#[cfg(feature = "cuda")]
fn with_device(builder: SessionBuilder, device: Device) -> Result<SessionBuilder, ModelLoadError> {
    use ort::execution_providers::CUDAExecutionProvider;

    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { ordinal } => builder
            .with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(ordinal as i32)
                .build()
                .error_on_failure()])
            .map_err(|e| ModelLoadError::DeviceUnavailable(format!("{}: {}", device, e))),
    }
}

#[cfg(not(feature = "cuda"))]
fn with_device(builder: SessionBuilder, device: Device) -> Result<SessionBuilder, ModelLoadError> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { .. } => Err(ModelLoadError::DeviceUnavailable(format!(
            "{} requested but lexsum was built without the `cuda` feature",
            device
        ))),
    }
}

fn inference(context: &'static str) -> impl Fn(ort::Error) -> GenerationError {
    move |e| GenerationError::Inference(format!("{}: {}", context, e))
}

fn tensor_i64(shape: Vec<usize>, data: Vec<i64>) -> Result<DynValue, GenerationError> {
    Tensor::from_array((shape, data.into_boxed_slice()))
        .map(|t| t.into_dyn())
        .map_err(inference("input tensor creation failed"))
}

/// Copies the named output (or the first one) out of a run's outputs as
/// `(dims, data)`.
macro_rules! take_output {
    ($outputs:expr, $name:expr) => {{
        let output_iter: Vec<_> = $outputs.iter().collect();
        let value = output_iter
            .iter()
            .find(|(n, _)| *n == $name)
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| GenerationError::Inference(format!("graph produced no '{}'", $name)))?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(inference("failed to extract output tensor"))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        (dims, data.to_vec())
    }};
}

impl Seq2SeqModel for LedOnnx {
    type Encoded = EncoderState;

    fn device(&self) -> Device {
        self.device
    }

    fn encode(&self, request: &GenerationRequest) -> Result<EncoderState, GenerationError> {
        let [batch, seq_len] = request.shape();
        if batch != 1 || seq_len == 0 {
            return Err(GenerationError::InvalidRequest(format!(
                "expected a single non-empty sequence, got shape [{}, {}]",
                batch, seq_len
            )));
        }
        let widen = |v: &[u32]| v.iter().map(|&x| x as i64).collect::<Vec<i64>>();
        let attention_mask = widen(&request.attention_mask);
        let inputs = vec![
            ("input_ids", tensor_i64(vec![1, seq_len], widen(&request.input_ids))?),
            ("attention_mask", tensor_i64(vec![1, seq_len], attention_mask.clone())?),
            (
                "global_attention_mask",
                tensor_i64(vec![1, seq_len], widen(&request.global_attention_mask))?,
            ),
        ];

        let mut session = self
            .encoder
            .lock()
            .map_err(|_| GenerationError::Inference("encoder session poisoned".into()))?;
        let outputs = session.run(inputs).map_err(inference("encoder run failed"))?;
        let (dims, hidden) = take_output!(outputs, "last_hidden_state");

        match dims.as_slice() {
            [1, n, h] if *n == seq_len => Ok(EncoderState {
                hidden,
                attention_mask,
                seq_len,
                hidden_size: *h,
            }),
            other => Err(GenerationError::Inference(format!(
                "unexpected encoder output shape {:?} for input length {}",
                other, seq_len
            ))),
        }
    }

    fn next_token_logits(
        &self,
        encoded: &EncoderState,
        prefixes: &[&[u32]],
    ) -> Result<Vec<Vec<f32>>, GenerationError> {
        let batch = prefixes.len();
        let target_len = prefixes.first().map(|p| p.len()).unwrap_or(0);
        if batch == 0 || target_len == 0 {
            return Err(GenerationError::InvalidRequest("no decoder prefixes".into()));
        }
        if prefixes.iter().any(|p| p.len() != target_len) {
            return Err(GenerationError::InvalidRequest(
                "decoder prefixes must share one length".into(),
            ));
        }

        let input_ids: Vec<i64> = prefixes
            .iter()
            .flat_map(|p| p.iter().map(|&t| t as i64))
            .collect();
        let mut mask = Vec::with_capacity(batch * encoded.seq_len);
        let mut hidden = Vec::with_capacity(batch * encoded.hidden.len());
        for _ in 0..batch {
            mask.extend_from_slice(&encoded.attention_mask);
            hidden.extend_from_slice(&encoded.hidden);
        }

        let hidden_tensor = Tensor::from_array((
            vec![batch, encoded.seq_len, encoded.hidden_size],
            hidden.into_boxed_slice(),
        ))
        .map_err(inference("hidden state tensor creation failed"))?;
        let inputs = vec![
            ("input_ids", tensor_i64(vec![batch, target_len], input_ids)?),
            (
                "encoder_attention_mask",
                tensor_i64(vec![batch, encoded.seq_len], mask)?,
            ),
            ("encoder_hidden_states", hidden_tensor.into_dyn()),
        ];

        let mut session = self
            .decoder
            .lock()
            .map_err(|_| GenerationError::Inference("decoder session poisoned".into()))?;
        let outputs = session.run(inputs).map_err(inference("decoder run failed"))?;
        let (dims, logits) = take_output!(outputs, "logits");

        let vocab = match dims.as_slice() {
            [b, t, v] if *b == batch && *t == target_len => *v,
            other => {
                return Err(GenerationError::Inference(format!(
                    "unexpected logits shape {:?} for {} prefixes of length {}",
                    other, batch, target_len
                )));
            }
        };
        Ok(last_position_rows(&logits, batch, target_len, vocab))
    }
}

/// Logits at the final target position for each batch row of a
/// `[batch, target_len, vocab]` buffer.
fn last_position_rows(
    logits: &[f32],
    batch: usize,
    target_len: usize,
    vocab: usize,
) -> Vec<Vec<f32>> {
    (0..batch)
        .map(|b| {
            let start = (b * target_len + target_len - 1) * vocab;
            logits[start..start + vocab].to_vec()
        })
        .collect()
}
