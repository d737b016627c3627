// Location: src/model/tokenizer.rs

use std::path::Path;

use tokenizers::{PaddingParams, Tokenizer as HfTokenizer};

use crate::error::{EngineError, Result};

/// Spellings of the end-of-sequence token across common chat vocabularies
const EOS_CANDIDATES: &[&str] = &["</s>", "<|endoftext|>", "<|im_end|>", "<|eot_id|>", "<eos>"];

/// Text <-> token-id codec paired with a loaded model
#[derive(Debug, Clone)]
pub struct ChatTokenizer {
    tokenizer: HfTokenizer,
    eos_token_id: u32,
    pad_token_id: u32,
    special_tokens: Vec<String>,
}

impl ChatTokenizer {
    /// Load `tokenizer.json` and make sure a padding token is defined.
    ///
    /// `declared_eos` are the end-of-sequence ids from the model config, used
    /// when the vocabulary has none of the usual EOS spellings.
    pub fn from_file(path: impl AsRef<Path>, declared_eos: &[u32]) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = HfTokenizer::from_file(path).map_err(|e| {
            EngineError::initialization(format!("Failed to load tokenizer {}", path.display()), e)
        })?;
        Self::new(tokenizer, declared_eos)
    }

    /// Wrap a loaded tokenizer; see [`ChatTokenizer::from_file`]
    pub fn new(mut tokenizer: HfTokenizer, declared_eos: &[u32]) -> Result<Self> {
        let eos = EOS_CANDIDATES
            .iter()
            .find_map(|t| tokenizer.token_to_id(t).map(|id| (id, t.to_string())))
            .or_else(|| {
                declared_eos
                    .iter()
                    .find_map(|&id| tokenizer.id_to_token(id).map(|t| (id, t)))
            });

        let existing_pad = tokenizer.get_padding().map(|p| p.pad_id);
        let pad_token_id = match (existing_pad, &eos) {
            (Some(pad_id), _) => pad_id,
            (None, Some((eos_id, eos_token))) => {
                tracing::debug!("Tokenizer has no pad token, using {} ({})", eos_token, eos_id);
                tokenizer.with_padding(Some(PaddingParams {
                    pad_id: *eos_id,
                    pad_token: eos_token.clone(),
                    ..Default::default()
                }));
                *eos_id
            }
            (None, None) => {
                return Err(EngineError::InitializationError {
                    message: "tokenizer defines neither a pad nor an end-of-sequence token"
                        .to_string(),
                    source: None,
                })
            }
        };

        let eos_token_id = eos.map(|(id, _)| id).unwrap_or(pad_token_id);

        let mut special_tokens: Vec<String> = tokenizer
            .get_added_tokens_decoder()
            .values()
            .filter(|t| t.special)
            .map(|t| t.content.clone())
            .collect();
        // longest first so "</s>" never clips a longer marker that contains it
        special_tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Ok(Self {
            tokenizer,
            eos_token_id,
            pad_token_id,
            special_tokens,
        })
    }

    /// Encode text to token IDs, adding the model's BOS handling
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EngineError::processing("Tokenization failed", e))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode token IDs back to text, keeping special markers
    pub fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, false)
            .map_err(|e| EngineError::processing("Decoding failed", e))
    }

    /// Remove special-token strings from decoded text
    pub fn strip_special_tokens(&self, text: &str) -> String {
        strip_markers(text, &self.special_tokens)
    }

    /// End-of-sequence id
    pub fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    /// Padding id
    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    /// Special-token strings, longest first
    pub fn special_tokens(&self) -> &[String] {
        &self.special_tokens
    }

    /// Vocabulary size including added tokens
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

pub(crate) fn strip_markers(text: &str, markers: &[String]) -> String {
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .fold(text.to_string(), |acc, marker| acc.replace(marker.as_str(), ""))
}
