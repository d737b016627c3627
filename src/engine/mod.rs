//! Engine module: prompt formatting, generation and reply extraction

mod builder;
mod extract;
mod generation;
mod prompt;

pub use builder::EngineBuilder;
pub use extract::extract_reply;
pub use generation::GenerationEngine;
pub use prompt::{format_prompt, ASSISTANT_OPEN, SYSTEM_CLOSE, SYSTEM_OPEN, USER_CLOSE, USER_OPEN};

use crate::{
    config::{GenerationConfig, PromptConfig},
    error::Result,
    types::{GenerationRequest, GenerationResult},
};

/// Anything that can continue a formatted prompt.
///
/// [`GenerationEngine`] runs the real model; tests plug in scripted generators.
pub trait TextGenerator {
    /// Continue `formatted_prompt` and return the full decoded sequence with
    /// special markers retained
    fn generate(&self, formatted_prompt: &str, request: GenerationRequest) -> Result<String>;

    /// Remove tokenizer-specific markers from the extracted reply
    fn clean_reply(&self, reply: &str) -> String {
        reply.to_string()
    }
}

/// One turn of the pipeline: format, generate, extract
#[derive(Debug)]
pub struct Assistant<G> {
    generator: G,
    prompt: PromptConfig,
    generation: GenerationConfig,
}

impl<G: TextGenerator> Assistant<G> {
    /// Wrap a generator with its prompt and parameters
    pub fn new(generator: G, prompt: PromptConfig, generation: GenerationConfig) -> Self {
        Self {
            generator,
            prompt,
            generation,
        }
    }

    /// Answer `user_message` with the configured generation parameters
    pub fn respond(&self, user_message: &str) -> Result<GenerationResult> {
        self.respond_with(user_message, &self.generation)
    }

    /// Answer `user_message` with explicit generation parameters
    pub fn respond_with(
        &self,
        user_message: &str,
        params: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let request = GenerationRequest::new(user_message, params)?;
        let prompt = format_prompt(&self.prompt.system_prompt, request.user_message());
        let raw_decoded_text = self.generator.generate(&prompt, request)?;
        let reply = extract_reply(&raw_decoded_text);
        let extracted_reply = self.generator.clean_reply(&reply).trim().to_string();

        Ok(GenerationResult {
            raw_decoded_text,
            extracted_reply,
        })
    }

    /// Assistant name used in the terminal protocol
    pub fn name(&self) -> &str {
        &self.prompt.assistant_name
    }

    /// Default generation parameters
    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Underlying text generator
    pub fn generator(&self) -> &G {
        &self.generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::cell::RefCell;

    /// Echoes the prompt and appends a canned completion
    struct ScriptedGenerator {
        completion: String,
        seen: RefCell<Vec<(String, usize)>>,
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&self, formatted_prompt: &str, request: GenerationRequest) -> Result<String> {
            self.seen
                .borrow_mut()
                .push((formatted_prompt.to_string(), request.max_new_tokens()));
            Ok(format!("<s> {formatted_prompt}{}", self.completion))
        }

        fn clean_reply(&self, reply: &str) -> String {
            reply.replace("</s>", "").replace("<s>", "")
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        fn generate(&self, _: &str, _: GenerationRequest) -> Result<String> {
            Err(EngineError::ProcessingError {
                message: "CUDA out of memory".to_string(),
                source: None,
            })
        }
    }

    fn assistant(completion: &str) -> Assistant<ScriptedGenerator> {
        Assistant::new(
            ScriptedGenerator {
                completion: completion.to_string(),
                seen: RefCell::new(Vec::new()),
            },
            PromptConfig::default(),
            GenerationConfig::default(),
        )
    }

    #[test]
    fn test_respond_extracts_reply() {
        let assistant = assistant("High blood pressure.</s>");
        let result = assistant.respond("What is hypertension?").unwrap();
        assert_eq!(result.extracted_reply, "High blood pressure.");
        assert!(result.raw_decoded_text.contains("<|assistant|>"));
        assert!(result.raw_decoded_text.ends_with("</s>"));

        let seen = assistant.generator().seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("What is hypertension?"));
        assert_eq!(seen[0].1, 400);
    }

    #[test]
    fn test_respond_with_overrides() {
        let assistant = assistant("ok");
        let params = GenerationConfig {
            max_new_tokens: 16,
            ..Default::default()
        };
        assistant.respond_with("hi", &params).unwrap();
        assert_eq!(assistant.generator().seen.borrow()[0].1, 16);
    }

    #[test]
    fn test_invalid_parameters_never_reach_generator() {
        let assistant = assistant("ok");
        let params = GenerationConfig {
            top_p: 2.0,
            ..Default::default()
        };
        assert!(assistant.respond_with("hi", &params).is_err());
        assert!(assistant.generator().seen.borrow().is_empty());
    }

    #[test]
    fn test_generator_error_propagates() {
        let assistant = Assistant::new(
            FailingGenerator,
            PromptConfig::default(),
            GenerationConfig::default(),
        );
        let err = assistant.respond("hi").unwrap_err();
        assert!(err.to_string().contains("out of memory"));
    }
}
