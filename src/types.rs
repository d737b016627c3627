//! Per-turn request and result types

use crate::config::GenerationConfig;
use crate::error::Result;

/// One validated generation call; built per turn and consumed once
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    user_message: String,
    max_new_tokens: usize,
    temperature: f64,
    top_p: f64,
    top_k: usize,
    repetition_penalty: f32,
    do_sample: bool,
    seed: u64,
}

impl GenerationRequest {
    /// Build a request for `user_message`, rejecting out-of-range parameters
    pub fn new(user_message: impl Into<String>, params: &GenerationConfig) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            user_message: user_message.into(),
            max_new_tokens: params.max_new_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            repetition_penalty: params.repetition_penalty,
            do_sample: params.do_sample,
            seed: params.seed,
        })
    }

    /// Question as typed
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Upper bound on generated tokens
    pub fn max_new_tokens(&self) -> usize {
        self.max_new_tokens
    }

    /// Sampling temperature
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Nucleus sampling threshold
    pub fn top_p(&self) -> f64 {
        self.top_p
    }

    /// 0 means no top-k restriction
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// 1.0 disables the penalty
    pub fn repetition_penalty(&self) -> f32 {
        self.repetition_penalty
    }

    /// Argmax decoding when false
    pub fn do_sample(&self) -> bool {
        self.do_sample
    }

    /// Sampler seed
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Output of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// Full decoded sequence, prompt included, special markers retained
    pub raw_decoded_text: String,
    /// Assistant reply shown to the user
    pub extracted_reply: String,
}
