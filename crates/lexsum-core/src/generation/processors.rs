use std::collections::HashSet;

use super::{GenerationConfig, SpecialTokens};

/// Adjusts next-token scores (log-probabilities) for one decoder prefix.
pub trait LogitsProcessor: Send + Sync {
    fn process(&self, prefix: &[u32], scores: &mut [f32]);
}

/// Divides positive scores and multiplies negative ones by `penalty` for
/// every token already present in the prefix.
pub struct RepetitionPenalty(pub f32);

impl LogitsProcessor for RepetitionPenalty {
    fn process(&self, prefix: &[u32], scores: &mut [f32]) {
        let seen: HashSet<u32> = prefix.iter().copied().collect();
        for token in seen {
            if let Some(score) = scores.get_mut(token as usize) {
                *score = if *score < 0.0 {
                    *score * self.0
                } else {
                    *score / self.0
                };
            }
        }
    }
}

/// Bans any token that would complete an n-gram already in the prefix.
pub struct NoRepeatNGram(pub usize);

impl NoRepeatNGram {
    pub fn banned_tokens(&self, prefix: &[u32]) -> Vec<u32> {
        let n = self.0;
        if n == 0 || prefix.len() + 1 < n {
            return Vec::new();
        }
        let tail = &prefix[prefix.len() + 1 - n..];
        prefix
            .windows(n)
            .filter(|gram| &gram[..n - 1] == tail)
            .map(|gram| gram[n - 1])
            .collect()
    }
}

impl LogitsProcessor for NoRepeatNGram {
    fn process(&self, prefix: &[u32], scores: &mut [f32]) {
        for token in self.banned_tokens(prefix) {
            if let Some(score) = scores.get_mut(token as usize) {
                *score = f32::NEG_INFINITY;
            }
        }
    }
}

pub struct MinLength {
    pub min_length: usize,
    pub eos_token_id: u32,
}

impl LogitsProcessor for MinLength {
    fn process(&self, prefix: &[u32], scores: &mut [f32]) {
        if prefix.len() < self.min_length {
            if let Some(score) = scores.get_mut(self.eos_token_id as usize) {
                *score = f32::NEG_INFINITY;
            }
        }
    }
}

/// Forces `token` when the prefix has exactly `at_length` tokens.
pub struct ForcedToken {
    pub at_length: usize,
    pub token: u32,
}

impl LogitsProcessor for ForcedToken {
    fn process(&self, prefix: &[u32], scores: &mut [f32]) {
        if prefix.len() != self.at_length || (self.token as usize) >= scores.len() {
            return;
        }
        scores.fill(f32::NEG_INFINITY);
        scores[self.token as usize] = 0.0;
    }
}

/// Processors in the order they are applied to each step's scores.
pub fn build_processors(
    config: &GenerationConfig,
    special: &SpecialTokens,
) -> Vec<Box<dyn LogitsProcessor>> {
    let mut processors: Vec<Box<dyn LogitsProcessor>> = Vec::new();
    if config.repetition_penalty != 1.0 {
        processors.push(Box::new(RepetitionPenalty(config.repetition_penalty)));
    }
    if config.no_repeat_ngram_size > 0 {
        processors.push(Box::new(NoRepeatNGram(config.no_repeat_ngram_size)));
    }
    if config.min_length > 0 {
        processors.push(Box::new(MinLength {
            min_length: config.min_length,
            eos_token_id: special.eos_token_id,
        }));
    }
    if let Some(bos) = special.forced_bos_token_id {
        processors.push(Box::new(ForcedToken {
            at_length: 1,
            token: bos,
        }));
    }
    processors.push(Box::new(ForcedToken {
        at_length: config.max_length - 1,
        token: special.eos_token_id,
    }));
    processors
}

/// Numerically stable log-softmax.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![f32::NEG_INFINITY; logits.len()];
    }
    let sum: f32 = logits.iter().map(|&l| (l - max).exp()).sum();
    let log_sum = sum.ln() + max;
    logits.iter().map(|&l| l - log_sum).collect()
}
