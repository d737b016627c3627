//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

use crate::config::{EngineConfig, LogLevel, Precision};

/// Kira - medical question answering with a fine-tuned language model
#[derive(Parser, Debug)]
#[command(name = "kira")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Model directory or Hub id; an adapter directory when --base_model is set
    /// [default: ./kira_final_model]
    #[arg(long = "model_path")]
    pub model_path: Option<String>,

    /// Base model to compose the adapter at --model_path with
    #[arg(long = "base_model")]
    pub base_model: Option<String>,

    /// Answer a single question and exit instead of starting a chat
    #[arg(long)]
    pub question: Option<String>,

    /// Sampling temperature [default: 0.7]
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Maximum new tokens per reply [default: 400]
    #[arg(long = "max_tokens")]
    pub max_tokens: Option<usize>,

    /// Top-p nucleus sampling [default: 0.9]
    #[arg(long = "top_p")]
    pub top_p: Option<f64>,

    /// Top-k sampling, 0 disables [default: 50]
    #[arg(long = "top_k")]
    pub top_k: Option<usize>,

    /// Penalty for repeated tokens, 1.0 disables [default: 1.1]
    #[arg(long = "repetition_penalty")]
    pub repetition_penalty: Option<f32>,

    /// Sampling seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Deterministic argmax decoding
    #[arg(long)]
    pub greedy: bool,

    /// Replace the default system instruction
    #[arg(long = "system_prompt")]
    pub system_prompt: Option<String>,

    /// Hub revision for remote artifacts [default: main]
    #[arg(long)]
    pub revision: Option<String>,

    /// Weight precision (default: f16 on GPU, f32 on CPU)
    #[arg(long, value_enum)]
    pub dtype: Option<Precision>,

    /// Run on CPU even when a GPU is available
    #[arg(long)]
    pub cpu: bool,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset [default: info]
    #[arg(long = "log_level", value_enum)]
    pub log_level: Option<LogLevel>,
}

impl Cli {
    /// Overwrite `config` with every flag that was given
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(model_path) = &self.model_path {
            config.model.model_path = model_path.clone();
        }
        if let Some(base_model) = &self.base_model {
            config.model.base_model = Some(base_model.clone());
        }
        if let Some(revision) = &self.revision {
            config.model.revision = revision.clone();
        }
        if let Some(dtype) = self.dtype {
            config.model.precision = Some(dtype);
        }
        if self.cpu {
            config.model.force_cpu = true;
        }

        let generation = &mut config.generation;
        if let Some(temperature) = self.temperature {
            generation.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            generation.max_new_tokens = max_tokens;
        }
        if let Some(top_p) = self.top_p {
            generation.top_p = top_p;
        }
        if let Some(top_k) = self.top_k {
            generation.top_k = top_k;
        }
        if let Some(penalty) = self.repetition_penalty {
            generation.repetition_penalty = penalty;
        }
        if let Some(seed) = self.seed {
            generation.seed = seed;
        }
        if self.greedy {
            generation.do_sample = false;
        }

        if let Some(system_prompt) = &self.system_prompt {
            config.prompt.system_prompt = system_prompt.clone();
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }

    /// Question for one-shot mode, if any non-blank one was given
    pub fn one_shot_question(&self) -> Option<&str> {
        self.question.as_deref().filter(|q| !q.trim().is_empty())
    }
}
