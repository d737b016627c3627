//! Kira engine - medical question answering over a fine-tuned causal language model
//!
//! This crate resolves a standalone or base-plus-adapter model once, wraps each
//! user question in the chat template, decodes a reply and isolates it from the
//! echoed prompt, either for a single question or in an interactive session.

#![warn(missing_docs)]

use std::fmt;

// Public modules
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod session;
pub mod types;
pub mod utils;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-exports for public API
pub use config::EngineConfig;
pub use engine::{Assistant, EngineBuilder, GenerationEngine, TextGenerator};
pub use error::{EngineError, Result};
pub use session::{SessionController, SessionState};
pub use types::{GenerationRequest, GenerationResult};

/// Accelerator backends usable by this build
pub struct Features {
    /// Whether a CUDA device is usable
    pub cuda: bool,
    /// Whether a Metal device is usable
    pub metal: bool,
}

impl Features {
    /// Detect available backends at runtime
    pub fn detect() -> Self {
        Self {
            cuda: candle_core::utils::cuda_is_available(),
            metal: candle_core::utils::metal_is_available(),
        }
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CUDA support: {}", if self.cuda { "yes" } else { "no" })?;
        writeln!(f, "Metal support: {}", if self.metal { "yes" } else { "no" })?;
        Ok(())
    }
}
