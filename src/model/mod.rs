//! Model module: artifact resolution, adapter composition and tokenizer setup

mod adapter;
mod artifact;
mod handle;
mod loader;
mod tokenizer;

pub use adapter::{AdapterConfig, AdapterOverlay};
pub use artifact::Artifact;
pub use handle::{ModelHandle, ModelSource};
pub use loader::{default_dtype, select_device, ModelResolver};
pub use tokenizer::ChatTokenizer;

