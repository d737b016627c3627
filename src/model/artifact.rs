// Location: src/model/artifact.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use serde::Deserialize;

use crate::error::{EngineError, Result};

pub(crate) const TOKENIZER_FILE: &str = "tokenizer.json";
pub(crate) const CONFIG_FILE: &str = "config.json";
pub(crate) const WEIGHTS_FILE: &str = "model.safetensors";
pub(crate) const WEIGHTS_INDEX_FILE: &str = "model.safetensors.index.json";
pub(crate) const ADAPTER_CONFIG_FILE: &str = "adapter_config.json";
pub(crate) const ADAPTER_WEIGHTS_FILE: &str = "adapter_model.safetensors";

const PICKLE_FILES: &[&str] = &["pytorch_model.bin", "adapter_model.bin"];

/// A model or adapter directory, on disk or on the hub
pub struct Artifact {
    name: String,
    store: Store,
}

enum Store {
    Local(PathBuf),
    Hub(ApiRepo),
}

#[derive(Deserialize)]
struct WeightIndex {
    weight_map: std::collections::HashMap<String, String>,
}

impl Artifact {
    /// Open `location` as a local directory, or as a hub repository id when no
    /// such directory exists
    pub fn open(location: &str, revision: &str) -> Result<Self> {
        let path = Path::new(location);
        if path.is_dir() {
            return Ok(Self {
                name: location.to_string(),
                store: Store::Local(path.to_path_buf()),
            });
        }

        if !looks_like_repo_id(location) {
            return Err(EngineError::ModelError {
                message: format!("model artifact not found: {location}"),
                source: None,
            });
        }

        tracing::debug!("Resolving {} (revision {}) on the hub", location, revision);
        let api = Api::new()
            .map_err(|e| EngineError::initialization("failed to initialise hub client", e))?;
        let repo = api.repo(Repo::with_revision(
            location.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        Ok(Self {
            name: location.to_string(),
            store: Store::Hub(repo),
        })
    }

    /// Location as given by the caller
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch a file that must exist
    pub fn file(&self, filename: &str) -> Result<PathBuf> {
        match &self.store {
            Store::Local(dir) => {
                let path = dir.join(filename);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(EngineError::ModelError {
                        message: format!("{} not found in {}", filename, self.name),
                        source: None,
                    })
                }
            }
            Store::Hub(repo) => repo.get(filename).map_err(|e| {
                EngineError::model(format!("failed to fetch {} from {}", filename, self.name), e)
            }),
        }
    }

    /// Fetch a file that may be absent
    pub fn optional_file(&self, filename: &str) -> Option<PathBuf> {
        match &self.store {
            Store::Local(dir) => Some(dir.join(filename)).filter(|p| p.is_file()),
            Store::Hub(repo) => repo.get(filename).ok(),
        }
    }

    /// Whether this artifact only carries adapter weights
    pub fn is_adapter(&self) -> bool {
        self.optional_file(ADAPTER_CONFIG_FILE).is_some()
    }

    /// Full model weights: a single safetensors file or the shards listed in its index
    pub fn weight_files(&self) -> Result<Vec<PathBuf>> {
        if let Some(index) = self.optional_file(WEIGHTS_INDEX_FILE) {
            let raw = std::fs::read_to_string(&index)?;
            let index: WeightIndex = serde_json::from_str(&raw).map_err(|e| {
                EngineError::model(format!("invalid {} in {}", WEIGHTS_INDEX_FILE, self.name), e)
            })?;
            let shards: BTreeSet<String> = index.weight_map.into_values().collect();
            return shards.iter().map(|shard| self.file(shard)).collect();
        }

        if let Some(weights) = self.optional_file(WEIGHTS_FILE) {
            return Ok(vec![weights]);
        }

        if let Some(pickle) = PICKLE_FILES
            .iter()
            .find(|f| self.optional_file(f).is_some())
        {
            return Err(EngineError::ModelError {
                message: format!(
                    "{} in {} uses the PyTorch pickle format; re-save the model as safetensors",
                    pickle, self.name
                ),
                source: None,
            });
        }

        if self.is_adapter() {
            return Err(EngineError::ModelError {
                message: format!(
                    "{} holds adapter weights only; pass --base_model to compose it{}",
                    self.name,
                    self.declared_base()
                        .map(|b| format!(" (trained on {b})"))
                        .unwrap_or_default()
                ),
                source: None,
            });
        }

        Err(EngineError::ModelError {
            message: format!("no model weights found in {}", self.name),
            source: None,
        })
    }

    fn declared_base(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct Declared {
            base_model_name_or_path: Option<String>,
        }
        let path = self.optional_file(ADAPTER_CONFIG_FILE)?;
        let raw = std::fs::read_to_string(path).ok()?;
        serde_json::from_str::<Declared>(&raw).ok()?.base_model_name_or_path
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.store {
            Store::Local(_) => "local",
            Store::Hub(_) => "hub",
        };
        f.debug_struct("Artifact")
            .field("name", &self.name)
            .field("store", &kind)
            .finish()
    }
}

/// `owner/name`, as opposed to a relative or absolute filesystem path
fn looks_like_repo_id(location: &str) -> bool {
    let mut parts = location.split('/');
    let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let valid = |s: &str| {
        !s.is_empty()
            && !s.starts_with('.')
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    valid(owner) && valid(name)
}
