//! Engine configuration: model location, generation parameters, prompt and logging

use std::path::{Path, PathBuf};

use candle_core::DType;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Instruction given to the assistant on every turn
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Kira, a knowledgeable medical assistant. \
Provide accurate, helpful information about medical topics.";

/// Where the fine-tuned model is saved by the training run
pub const DEFAULT_MODEL_PATH: &str = "./kira_final_model";

/// Complete engine configuration, loadable from JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Where and how the model is loaded
    pub model: ModelConfig,
    /// Decoding parameters for every turn
    pub generation: GenerationConfig,
    /// Chat template inputs
    pub prompt: PromptConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

/// Model location and load policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Local directory or hub repository holding the model or the adapter
    pub model_path: String,

    /// Base model the adapter at `model_path` is composed with
    pub base_model: Option<String>,

    /// Hub revision used for repository ids
    pub revision: String,

    /// Weight precision; picked from the device when unset
    pub precision: Option<Precision>,

    /// Skip accelerator detection
    pub force_cpu: bool,
}

/// Numeric precision for model weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Half precision
    F16,
    /// Brain floating point
    Bf16,
    /// Full precision
    F32,
}

impl Precision {
    /// Matching candle dtype
    pub fn dtype(self) -> DType {
        match self {
            Precision::F16 => DType::F16,
            Precision::Bf16 => DType::BF16,
            Precision::F32 => DType::F32,
        }
    }
}

/// Sampling and length limits for one reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum number of tokens to generate
    pub max_new_tokens: usize,

    /// Temperature for sampling
    pub temperature: f64,

    /// Top-p sampling threshold
    pub top_p: f64,

    /// Top-k sampling, 0 disables it
    pub top_k: usize,

    /// Repetition penalty
    pub repetition_penalty: f32,

    /// Sample from the distribution; argmax decoding when false
    pub do_sample: bool,

    /// Seed for the sampler
    pub seed: u64,
}

/// Fixed inputs of the chat template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// System instruction sent with every question
    pub system_prompt: String,
    /// Name shown before each reply
    pub assistant_name: String,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level for this crate when `RUST_LOG` is unset
    pub level: LogLevel,

    /// Include file and line in log lines
    pub source_location: bool,

    /// Append logs to this file instead of stderr
    pub file_path: Option<PathBuf>,
}

/// Verbosity of this crate's logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and above
    Warn,
    /// Progress messages and above
    Info,
    /// Detailed load and decode steps
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Name accepted by `EnvFilter`
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.to_string(),
            base_model: None,
            revision: "main".to_string(),
            precision: None,
            force_cpu: false,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 400,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
            repetition_penalty: 1.1,
            do_sample: true,
            seed: 299792458,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            assistant_name: "Kira".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            source_location: false,
            file_path: None,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_new_tokens == 0 {
            return Err(EngineError::configuration(
                "max_new_tokens",
                "must be a positive integer",
            ));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(EngineError::configuration(
                "temperature",
                format!("must be a positive real, got {}", self.temperature),
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(EngineError::configuration(
                "top_p",
                format!("must be in (0, 1], got {}", self.top_p),
            ));
        }
        if !(self.repetition_penalty.is_finite() && self.repetition_penalty >= 1.0) {
            return Err(EngineError::configuration(
                "repetition_penalty",
                format!("must be >= 1.0, got {}", self.repetition_penalty),
            ));
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Read a JSON configuration file; missing sections keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            EngineError::initialization(format!("invalid config file {}", path.display()), e)
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.model_path.trim().is_empty() {
            return Err(EngineError::configuration(
                "model_path",
                "Model path cannot be empty",
            ));
        }

        if let Some(base) = &self.model.base_model {
            if base.trim().is_empty() {
                return Err(EngineError::configuration(
                    "base_model",
                    "Base model cannot be empty when specified",
                ));
            }
        }

        self.generation.validate()
    }
}
