use std::collections::HashMap;
use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::llama::{Config, Llama, LlamaConfig};

use super::adapter::AdapterOverlay;
use super::artifact::{Artifact, CONFIG_FILE, TOKENIZER_FILE};
use super::handle::{declared_eos_ids, ModelHandle, ModelSource};
use super::tokenizer::ChatTokenizer;
use crate::config::ModelConfig;
use crate::error::{EngineError, Result};

/// Turns a [`ModelSource`] into a loaded model and its tokenizer
#[derive(Debug, Clone)]
pub struct ModelResolver {
    device: Device,
    dtype: DType,
    revision: String,
}

impl ModelResolver {
    /// Pick the device and precision from the model configuration
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let device = select_device(config.force_cpu)?;
        let dtype = config
            .precision
            .map(|p| p.dtype())
            .unwrap_or_else(|| default_dtype(&device));

        if dtype != DType::F32 && device.is_cpu() {
            tracing::warn!("Reduced precision {:?} on CPU is slow; consider --dtype f32", dtype);
        }

        Ok(Self::with_device(device, dtype, config.revision.clone()))
    }

    /// Use an explicit device and precision
    pub fn with_device(device: Device, dtype: DType, revision: impl Into<String>) -> Self {
        Self {
            device,
            dtype,
            revision: revision.into(),
        }
    }

    /// Device holding the weights
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Precision used for loading
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Load the tokenizer and the model for `source`.
    ///
    /// Any failure here is fatal for the session.
    pub fn resolve(&self, source: &ModelSource) -> Result<(ModelHandle, ChatTokenizer)> {
        tracing::info!("Using device: {:?} ({:?})", self.device, self.dtype);

        let location = Artifact::open(source.tokenizer_location(), &self.revision)?;
        let tokenizer_path = location.file(TOKENIZER_FILE)?;

        let (model, config) = match source {
            ModelSource::Standalone { .. } => {
                tracing::info!("Loading model from: {}", location.name());
                self.load_standalone(&location)?
            }
            ModelSource::Composed { base, .. } => {
                tracing::info!("Loading base model: {}", base);
                let base = Artifact::open(base, &self.revision)?;
                tracing::info!("Loading LoRA adapter from: {}", location.name());
                self.load_composed(&base, &location)?
            }
        };

        let tokenizer = ChatTokenizer::from_file(tokenizer_path, &declared_eos_ids(&config))?;
        if tokenizer.vocab_size() > config.vocab_size {
            return Err(EngineError::InitializationError {
                message: format!(
                    "tokenizer from {} has {} tokens but the model embeds only {}",
                    location.name(),
                    tokenizer.vocab_size(),
                    config.vocab_size
                ),
                source: None,
            });
        }

        let handle = ModelHandle::new(model, config, self.device.clone(), self.dtype, source.clone());
        tracing::info!("Model ready: {}", handle.source());
        Ok((handle, tokenizer))
    }

    fn load_standalone(&self, artifact: &Artifact) -> Result<(Llama, Config)> {
        let paths = artifact.weight_files()?;
        let config = read_llama_config(artifact)?;

        // SAFETY: the weight files are not modified while the model is alive
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&paths, self.dtype, &self.device) }
            .map_err(|e| {
                EngineError::model(format!("Failed to map weights of {}", artifact.name()), e)
            })?;
        let model = Llama::load(vb, &config).map_err(|e| {
            EngineError::model(format!("Failed to load model from {}", artifact.name()), e)
        })?;
        Ok((model, config))
    }

    fn load_composed(&self, base: &Artifact, adapter: &Artifact) -> Result<(Llama, Config)> {
        let config = read_llama_config(base)?;
        let mut weights = load_tensors(&base.weight_files()?, &self.device)?;

        let overlay = AdapterOverlay::load(adapter, &self.device)?;
        if let Some(declared) = &overlay.config().base_model_name_or_path {
            if declared != base.name() {
                tracing::warn!(
                    "Adapter {} was trained on {}, composing with {}",
                    adapter.name(),
                    declared,
                    base.name()
                );
            }
        }
        tracing::debug!(
            "Merging {} LoRA deltas (r={}, scale={})",
            overlay.len(),
            overlay.config().r,
            overlay.config().scale()
        );
        overlay.merge_into(&mut weights).map_err(|e| match e {
            e @ EngineError::ModelError { .. } => e,
            other => EngineError::model(format!("Failed to merge adapter {}", adapter.name()), other),
        })?;

        let vb = VarBuilder::from_tensors(weights, self.dtype, &self.device);
        let model = Llama::load(vb, &config).map_err(|e| {
            EngineError::model(format!("Failed to compose model from {}", base.name()), e)
        })?;
        Ok((model, config))
    }
}

/// CPU when forced, otherwise the first CUDA or Metal device if one exists
pub fn select_device(force_cpu: bool) -> Result<Device> {
    if force_cpu {
        return Ok(Device::Cpu);
    }
    let features = crate::Features::detect();
    if features.cuda {
        return Device::new_cuda(0).map_err(|e| EngineError::DeviceError {
            message: format!("CUDA device 0 unavailable: {e}"),
        });
    }
    if features.metal {
        return Device::new_metal(0).map_err(|e| EngineError::DeviceError {
            message: format!("Metal device 0 unavailable: {e}"),
        });
    }
    Ok(Device::Cpu)
}

/// Half precision on accelerators, full precision on CPU
pub fn default_dtype(device: &Device) -> DType {
    if device.is_cpu() {
        DType::F32
    } else {
        DType::F16
    }
}

fn read_llama_config(artifact: &Artifact) -> Result<Config> {
    let path = artifact.file(CONFIG_FILE)?;
    let raw = std::fs::read_to_string(&path)?;
    let config: LlamaConfig = serde_json::from_str(&raw).map_err(|e| {
        EngineError::model(
            format!("{} in {} is not a Llama config", CONFIG_FILE, artifact.name()),
            e,
        )
    })?;
    Ok(config.into_config(false))
}

fn load_tensors(paths: &[PathBuf], device: &Device) -> Result<HashMap<String, Tensor>> {
    let mut weights = HashMap::new();
    for path in paths {
        let shard = candle_core::safetensors::load(path, device).map_err(|e| {
            EngineError::model(format!("Failed to read weights {}", path.display()), e)
        })?;
        weights.extend(shard);
    }
    Ok(weights)
}
