// Location: src/model/handle.rs

use std::fmt;

use candle_core::{DType, Device, Tensor};
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaEosToks};

use crate::error::Result;

/// Which load path produced a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A complete fine-tuned model at `location`
    Standalone { location: String },
    /// Base model `base` with the adapter at `adapter` merged in
    Composed { base: String, adapter: String },
}

impl ModelSource {
    /// Pick the load path from the command-line arguments
    pub fn from_args(model_location: &str, base_model_id: Option<&str>) -> Self {
        match base_model_id {
            Some(base) => ModelSource::Composed {
                base: base.to_string(),
                adapter: model_location.to_string(),
            },
            None => ModelSource::Standalone {
                location: model_location.to_string(),
            },
        }
    }

    /// Location the tokenizer is read from
    pub fn tokenizer_location(&self) -> &str {
        match self {
            ModelSource::Standalone { location } => location,
            ModelSource::Composed { adapter, .. } => adapter,
        }
    }

    /// Whether an adapter is merged in
    pub fn is_composed(&self) -> bool {
        matches!(self, ModelSource::Composed { .. })
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Standalone { location } => write!(f, "{location}"),
            ModelSource::Composed { base, adapter } => write!(f, "{base} + {adapter}"),
        }
    }
}

/// Loaded, inference-only model bound to one device and precision.
///
/// Weights are plain tensors with no gradient tracking, and the Llama blocks
/// carry no dropout, so the handle is always in evaluation mode. Nothing
/// mutates it after [`crate::model::ModelResolver`] returns it; each
/// generation gets its own KV cache.
pub struct ModelHandle {
    model: Llama,
    config: Config,
    device: Device,
    dtype: DType,
    source: ModelSource,
}

impl ModelHandle {
    pub(crate) fn new(
        model: Llama,
        config: Config,
        device: Device,
        dtype: DType,
        source: ModelSource,
    ) -> Self {
        Self {
            model,
            config,
            device,
            dtype,
            source,
        }
    }

    /// Device holding the weights
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Precision the weights were loaded at
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Load path that produced this handle
    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Context window of the model
    pub fn max_position_embeddings(&self) -> usize {
        self.config.max_position_embeddings
    }

    /// Vocabulary size of the model
    pub fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    /// End-of-sequence ids declared in the model config
    pub fn eos_token_ids(&self) -> Vec<u32> {
        declared_eos_ids(&self.config)
    }

    /// Fresh KV cache for one generation
    pub fn new_cache(&self) -> Result<Cache> {
        Ok(Cache::new(true, self.dtype, &self.config, &self.device)?)
    }

    /// Logits for the last position of `input` (shape `[1, seq]`)
    pub fn forward(&self, input: &Tensor, index_pos: usize, cache: &mut Cache) -> Result<Tensor> {
        Ok(self.model.forward(input, index_pos, cache)?)
    }
}

pub(crate) fn declared_eos_ids(config: &Config) -> Vec<u32> {
    match &config.eos_token_id {
        Some(LlamaEosToks::Single(id)) => vec![*id],
        Some(LlamaEosToks::Multiple(ids)) => ids.clone(),
        None => Vec::new(),
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source", &self.source)
            .field("device", &self.device)
            .field("dtype", &self.dtype)
            .field("vocab_size", &self.config.vocab_size)
            .field("max_position_embeddings", &self.config.max_position_embeddings)
            .finish()
    }
}
