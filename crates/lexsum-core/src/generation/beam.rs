use std::cmp::Ordering;

use super::processors::{build_processors, log_softmax};
use super::{GenerationConfig, GenerationError, Seq2SeqModel, SpecialTokens};
use crate::pipeline::GenerationRequest;
use crate::{Device, Generator};

/// A finished (or length-capped) output sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Decoder tokens, starting with the decoder start token.
    pub tokens: Vec<u32>,
    /// Length-normalized sum of log-probabilities.
    pub score: f32,
}

struct Beam {
    tokens: Vec<u32>,
    sum_logprobs: f32,
}

struct Candidate {
    sum_logprobs: f32,
    beam: usize,
    token: u32,
}

/// Best-first ordering with a total tie-break so results are reproducible.
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.sum_logprobs
        .total_cmp(&a.sum_logprobs)
        .then(a.beam.cmp(&b.beam))
        .then(a.token.cmp(&b.token))
}

/// Bounded set of the `num_beams` best finished hypotheses.
struct FinishedHypotheses {
    num_beams: usize,
    length_penalty: f32,
    early_stopping: bool,
    hyps: Vec<Hypothesis>,
}

impl FinishedHypotheses {
    fn new(config: &GenerationConfig) -> Self {
        Self {
            num_beams: config.num_beams,
            length_penalty: config.length_penalty,
            early_stopping: config.early_stopping,
            hyps: Vec::with_capacity(config.num_beams + 1),
        }
    }

    fn worst_score(&self) -> f32 {
        self.hyps
            .iter()
            .map(|h| h.score)
            .fold(f32::INFINITY, f32::min)
    }

    /// `scored_len` is the sequence length used for length normalization
    /// (the end-of-sequence token is not counted).
    fn add(&mut self, tokens: Vec<u32>, sum_logprobs: f32, scored_len: usize) {
        let score = sum_logprobs / (scored_len.max(1) as f32).powf(self.length_penalty);
        if self.hyps.len() < self.num_beams || score > self.worst_score() {
            self.hyps.push(Hypothesis { tokens, score });
            if self.hyps.len() > self.num_beams {
                let worst = self
                    .hyps
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.score.total_cmp(&b.1.score))
                    .map(|(i, _)| i);
                if let Some(i) = worst {
                    self.hyps.remove(i);
                }
            }
        }
    }

    fn is_done(&self, best_live_sum_logprobs: f32, cur_len: usize) -> bool {
        if self.hyps.len() < self.num_beams {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        let best_possible = best_live_sum_logprobs / (cur_len as f32).powf(self.length_penalty);
        self.worst_score() >= best_possible
    }

    fn into_sorted(mut self) -> Vec<Hypothesis> {
        self.hyps.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.hyps
    }
}

/// Deterministic beam search over a [`Seq2SeqModel`].
pub struct BeamSearch<M> {
    model: M,
    special: SpecialTokens,
}

impl<M: Seq2SeqModel> BeamSearch<M> {
    pub fn new(model: M, special: SpecialTokens) -> Self {
        Self { model, special }
    }

    pub fn special_tokens(&self) -> &SpecialTokens {
        &self.special
    }

    /// Run the search and return finished hypotheses, best first.
    pub fn search(
        &self,
        request: &GenerationRequest,
        config: &GenerationConfig,
    ) -> Result<Vec<Hypothesis>, GenerationError> {
        config.validate()?;
        let encoded = self.model.encode(request)?;
        let processors = build_processors(config, &self.special);
        let eos = self.special.eos_token_id;
        let width = 2 * config.num_beams;

        let mut beams = vec![Beam {
            tokens: vec![self.special.decoder_start_token_id],
            sum_logprobs: 0.0,
        }];
        let mut finished = FinishedHypotheses::new(config);
        let mut cur_len = 1;
        let mut done = false;

        while cur_len < config.max_length {
            let prefixes: Vec<&[u32]> = beams.iter().map(|b| b.tokens.as_slice()).collect();
            let logits = self.model.next_token_logits(&encoded, &prefixes)?;
            if logits.len() != beams.len() {
                return Err(GenerationError::Inference(format!(
                    "expected logits for {} beams, got {}",
                    beams.len(),
                    logits.len()
                )));
            }

            let mut candidates = Vec::new();
            for (i, (beam, row)) in beams.iter().zip(&logits).enumerate() {
                let mut scores = log_softmax(row);
                for processor in &processors {
                    processor.process(&beam.tokens, &mut scores);
                }
                candidates.extend(scores.iter().enumerate().filter(|(_, s)| s.is_finite()).map(
                    |(token, s)| Candidate {
                        sum_logprobs: beam.sum_logprobs + s,
                        beam: i,
                        token: token as u32,
                    },
                ));
            }

            if candidates.len() > width {
                candidates.select_nth_unstable_by(width - 1, rank);
                candidates.truncate(width);
            }
            candidates.sort_by(rank);

            let mut next = Vec::with_capacity(config.num_beams);
            for (position, candidate) in candidates.iter().enumerate() {
                let parent = &beams[candidate.beam];
                if candidate.token == eos {
                    // an EOS outside the top `num_beams` does not finish a hypothesis
                    if position >= config.num_beams {
                        continue;
                    }
                    let mut tokens = parent.tokens.clone();
                    tokens.push(eos);
                    finished.add(tokens, candidate.sum_logprobs, parent.tokens.len());
                } else {
                    let mut tokens = parent.tokens.clone();
                    tokens.push(candidate.token);
                    next.push(Beam {
                        tokens,
                        sum_logprobs: candidate.sum_logprobs,
                    });
                }
                if next.len() == config.num_beams {
                    break;
                }
            }

            cur_len += 1;
            tracing::trace!(cur_len, live = next.len(), finished = finished.hyps.len(), "beam step");

            if next.is_empty() {
                done = true;
                break;
            }
            let best_live = next[0].sum_logprobs;
            beams = next;
            if finished.is_done(best_live, cur_len) {
                done = true;
                break;
            }
        }

        if !done {
            for beam in beams {
                let len = beam.tokens.len();
                finished.add(beam.tokens, beam.sum_logprobs, len);
            }
        }

        let hyps = finished.into_sorted();
        tracing::debug!(
            steps = cur_len,
            best_len = hyps.first().map(|h| h.tokens.len()).unwrap_or(0),
            best_score = hyps.first().map(|h| h.score).unwrap_or(f32::NEG_INFINITY),
            "beam search finished"
        );
        if hyps.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }
        Ok(hyps)
    }
}

impl<M: Seq2SeqModel> Generator for BeamSearch<M> {
    fn device(&self) -> Device {
        self.model.device()
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        config: &GenerationConfig,
    ) -> Result<Vec<Vec<u32>>, GenerationError> {
        Ok(self
            .search(request, config)?
            .into_iter()
            .map(|h| h.tokens)
            .collect())
    }
}
