use crate::{
    config::EngineConfig,
    error::Result,
    model::{ModelResolver, ModelSource},
};

use super::{generation::GenerationEngine, Assistant};

/// Builder for a ready-to-answer [`Assistant`] backed by the real model
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: Option<EngineConfig>,
}

impl EngineBuilder {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Set the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load source selected by the configuration
    pub fn source(&self) -> ModelSource {
        let config = self.config.clone().unwrap_or_default();
        ModelSource::from_args(&config.model.model_path, config.model.base_model.as_deref())
    }

    /// Validate the configuration and resolve the model once
    pub fn build(self) -> Result<Assistant<GenerationEngine>> {
        let source = self.source();
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let resolver = ModelResolver::new(&config.model)?;
        let (handle, tokenizer) = resolver.resolve(&source)?;

        Ok(Assistant::new(
            GenerationEngine::new(handle, tokenizer),
            config.prompt,
            config.generation,
        ))
    }
}
