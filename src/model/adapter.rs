//! LoRA adapter overlay: parses a PEFT adapter and folds its low-rank deltas
//! into base weights.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use serde::{Deserialize, Serialize};

use super::artifact::{Artifact, ADAPTER_CONFIG_FILE, ADAPTER_WEIGHTS_FILE};
use crate::error::{EngineError, Result};

const PEFT_PREFIX: &str = "base_model.model.";

/// Subset of `adapter_config.json` needed for inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// LoRA rank
    pub r: usize,
    /// LoRA scaling numerator
    pub lora_alpha: f64,
    /// Module names the adapter was trained on
    #[serde(default)]
    pub target_modules: Vec<String>,
    /// Rank-stabilised scaling, `alpha / sqrt(r)`
    #[serde(default)]
    pub use_rslora: bool,
    /// Deltas are stored transposed
    #[serde(default)]
    pub fan_in_fan_out: bool,
    /// Base model recorded at training time
    #[serde(default)]
    pub base_model_name_or_path: Option<String>,
}

impl AdapterConfig {
    /// Multiplier applied to `B · A`
    pub fn scale(&self) -> f64 {
        if self.use_rslora {
            self.lora_alpha / (self.r as f64).sqrt()
        } else {
            self.lora_alpha / self.r as f64
        }
    }
}

/// A pair of low-rank factors targeting one base weight
#[derive(Debug)]
struct LoraPair {
    a: Option<Tensor>,
    b: Option<Tensor>,
}

/// Low-rank weight delta loaded from an adapter artifact
#[derive(Debug)]
pub struct AdapterOverlay {
    config: AdapterConfig,
    /// Keyed by the base weight name, e.g. `model.layers.0.self_attn.q_proj.weight`
    pairs: HashMap<String, LoraPair>,
}

impl AdapterOverlay {
    /// Load `adapter_config.json` and `adapter_model.safetensors` from `artifact`
    pub fn load(artifact: &Artifact, device: &Device) -> Result<Self> {
        let config_path = artifact.file(ADAPTER_CONFIG_FILE)?;
        let config = read_config(&config_path)?;
        let weights_path = artifact.file(ADAPTER_WEIGHTS_FILE)?;
        let tensors = candle_core::safetensors::load(&weights_path, device).map_err(|e| {
            EngineError::model(format!("failed to read adapter weights from {}", artifact.name()), e)
        })?;
        Self::from_tensors(config, tensors)
    }

    /// Group raw PEFT tensors into A/B pairs
    pub fn from_tensors(config: AdapterConfig, tensors: HashMap<String, Tensor>) -> Result<Self> {
        if config.r == 0 {
            return Err(EngineError::ModelError {
                message: "adapter rank r must be positive".to_string(),
                source: None,
            });
        }

        let mut pairs: HashMap<String, LoraPair> = HashMap::new();
        for (name, tensor) in tensors {
            let Some((module, factor)) = split_lora_key(&name) else {
                tracing::debug!("Ignoring non-LoRA adapter tensor {}", name);
                continue;
            };
            let pair = pairs
                .entry(format!("{module}.weight"))
                .or_insert(LoraPair { a: None, b: None });
            match factor {
                Factor::A => pair.a = Some(tensor),
                Factor::B => pair.b = Some(tensor),
            }
        }

        if pairs.is_empty() {
            return Err(EngineError::ModelError {
                message: "adapter contains no LoRA weights".to_string(),
                source: None,
            });
        }
        if let Some((name, _)) = pairs.iter().find(|(_, p)| p.a.is_none() || p.b.is_none()) {
            return Err(EngineError::ModelError {
                message: format!("adapter is missing one LoRA factor for {name}"),
                source: None,
            });
        }

        Ok(Self { config, pairs })
    }

    /// Parsed adapter configuration
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Number of base weights this overlay modifies
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no deltas were loaded
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Fold every delta into `weights`, consuming the overlay.
    ///
    /// Arithmetic runs in f32; merged weights keep their stored dtype.
    pub fn merge_into(self, weights: &mut HashMap<String, Tensor>) -> Result<()> {
        let scale = self.config.scale();
        for (name, pair) in self.pairs {
            let (Some(a), Some(b)) = (pair.a, pair.b) else {
                continue;
            };
            let base = weights.get(&name).ok_or_else(|| EngineError::ModelError {
                message: format!("adapter targets {name}, which the base model does not have"),
                source: None,
            })?;

            let a = a.to_device(base.device())?.to_dtype(DType::F32)?;
            let b = b.to_device(base.device())?.to_dtype(DType::F32)?;
            let mut delta = b.matmul(&a)?;
            if self.config.fan_in_fan_out {
                delta = delta.t()?;
            }
            if delta.dims() != base.dims() {
                return Err(EngineError::ModelError {
                    message: format!(
                        "adapter delta for {} has shape {:?}, base weight has {:?}",
                        name,
                        delta.dims(),
                        base.dims()
                    ),
                    source: None,
                });
            }

            let merged = (base.to_dtype(DType::F32)? + delta.affine(scale, 0.0)?)?
                .to_dtype(base.dtype())?;
            weights.insert(name, merged);
        }
        Ok(())
    }
}

enum Factor {
    A,
    B,
}

/// `base_model.model.<module>.lora_A[.default].weight` -> (`<module>`, A)
fn split_lora_key(name: &str) -> Option<(&str, Factor)> {
    let name = name.strip_prefix(PEFT_PREFIX).unwrap_or(name);
    let name = name.strip_suffix(".weight")?;
    let name = name.strip_suffix(".default").unwrap_or(name);
    if let Some(module) = name.strip_suffix(".lora_A") {
        Some((module, Factor::A))
    } else {
        name.strip_suffix(".lora_B").map(|module| (module, Factor::B))
    }
}

fn read_config(path: &Path) -> Result<AdapterConfig> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        EngineError::model(format!("invalid adapter config {}", path.display()), e)
    })
}
