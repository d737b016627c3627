//! Error types for model loading and turn processing

use std::error::Error as StdError;

/// Result type used across the engine
pub type Result<T> = std::result::Result<T, EngineError>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors produced while resolving the model or answering a turn
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Startup failure outside of the model weights themselves (tokenizer, hub, logging)
    #[error("Initialization error: {message}")]
    InitializationError {
        /// What failed
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Model or adapter artifact could not be loaded or composed
    #[error("Model error: {message}")]
    ModelError {
        /// What failed
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// A configuration value is out of range
    #[error("Configuration error for {parameter}: {message}")]
    ConfigurationError {
        /// Why the value was rejected
        message: String,
        /// Name of the offending parameter
        parameter: String,
    },

    /// A single turn failed (tokenization, forward pass, sampling, decoding)
    #[error("Processing error: {message}")]
    ProcessingError {
        /// What failed
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Requested device or precision is unavailable
    #[error("Device error: {message}")]
    DeviceError {
        /// What is missing
        message: String,
    },

    /// Terminal or filesystem I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn initialization(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        EngineError::InitializationError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn model(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        EngineError::ModelError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn processing(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        EngineError::ProcessingError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn configuration(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::ConfigurationError {
            message: message.into(),
            parameter: parameter.into(),
        }
    }
}

impl From<candle_core::Error> for EngineError {
    fn from(e: candle_core::Error) -> Self {
        EngineError::processing("tensor operation failed", e)
    }
}

/// Extension trait for error handling utilities
pub trait ErrorExt {
    /// Whether the session can keep going after this error
    fn is_recoverable(&self) -> bool;
}

impl ErrorExt for EngineError {
    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::ProcessingError { .. } | EngineError::ConfigurationError { .. }
        )
    }
}
