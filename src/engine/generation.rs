// Location: src/engine/generation.rs

use std::time::Instant;

use candle_core::{DType, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::utils::apply_repeat_penalty;

use super::TextGenerator;
use crate::error::{EngineError, Result};
use crate::model::{ChatTokenizer, ModelHandle};
use crate::types::GenerationRequest;

/// Autoregressive decoding over a resolved model
#[derive(Debug)]
pub struct GenerationEngine {
    handle: ModelHandle,
    tokenizer: ChatTokenizer,
    eos_token_ids: Vec<u32>,
}

impl GenerationEngine {
    /// Stop on the model's EOS ids and the tokenizer's
    pub fn new(handle: ModelHandle, tokenizer: ChatTokenizer) -> Self {
        let mut eos_token_ids = handle.eos_token_ids();
        if !eos_token_ids.contains(&tokenizer.eos_token_id()) {
            eos_token_ids.push(tokenizer.eos_token_id());
        }
        Self {
            handle,
            tokenizer,
            eos_token_ids,
        }
    }

    /// Model used for decoding
    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// Tokenizer paired with the model
    pub fn tokenizer(&self) -> &ChatTokenizer {
        &self.tokenizer
    }

    fn is_eos(&self, token: u32) -> bool {
        self.eos_token_ids.contains(&token)
    }
}

impl TextGenerator for GenerationEngine {
    fn generate(&self, formatted_prompt: &str, request: GenerationRequest) -> Result<String> {
        let start_time = Instant::now();

        let prompt_tokens = self.tokenizer.encode(formatted_prompt)?;
        let prompt_len = prompt_tokens.len();
        let context_window = self.handle.max_position_embeddings();
        if prompt_len == 0 {
            return Err(EngineError::ProcessingError {
                message: "prompt encodes to no tokens".to_string(),
                source: None,
            });
        }
        if prompt_len >= context_window {
            return Err(EngineError::ProcessingError {
                message: format!(
                    "prompt is {prompt_len} tokens, the model context window is {context_window}"
                ),
                source: None,
            });
        }

        let budget = request.max_new_tokens().min(context_window - prompt_len);
        if budget < request.max_new_tokens() {
            tracing::warn!(
                "Generation capped at {} tokens by the context window",
                budget
            );
        }

        let mut tokens = prompt_tokens;
        let mut cache = self.handle.new_cache()?;
        let mut logits_processor =
            LogitsProcessor::from_sampling(request.seed(), sampling_for(&request));
        let mut index_pos = 0;

        for step in 0..budget {
            let context_size = if step == 0 { tokens.len() } else { 1 };
            let context = &tokens[tokens.len() - context_size..];
            let input = Tensor::new(context, self.handle.device())?.unsqueeze(0)?;
            let logits = self.handle.forward(&input, index_pos, &mut cache)?;
            index_pos += context_size;

            let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
            let logits = if request.repetition_penalty() == 1.0 {
                logits
            } else {
                apply_repeat_penalty(&logits, request.repetition_penalty(), &tokens)?
            };

            let next_token = logits_processor.sample(&logits)?;
            tokens.push(next_token);
            if self.is_eos(next_token) {
                break;
            }
        }

        let generated = tokens.len() - prompt_len;
        let elapsed = start_time.elapsed();
        tracing::info!(
            "Generated {} tokens in {:.2}s ({:.1} tok/s)",
            generated,
            elapsed.as_secs_f64(),
            generated as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );

        self.tokenizer.decode(&tokens)
    }

    fn clean_reply(&self, reply: &str) -> String {
        self.tokenizer.strip_special_tokens(reply)
    }
}

/// Map request parameters onto candle's sampler
pub(crate) fn sampling_for(request: &GenerationRequest) -> Sampling {
    if !request.do_sample() {
        return Sampling::ArgMax;
    }
    let temperature = request.temperature();
    let p = request.top_p();
    match (request.top_k(), p < 1.0) {
        (0, false) => Sampling::All { temperature },
        (0, true) => Sampling::TopP { p, temperature },
        (k, false) => Sampling::TopK { k, temperature },
        (k, true) => Sampling::TopKThenTopP { k, p, temperature },
    }
}
