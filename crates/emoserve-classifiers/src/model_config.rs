//! Model source and inference configuration

use emoserve_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hub repository of the emotion model served by default
pub const DEFAULT_MODEL_REPO: &str = "bhadresh-savani/distilbert-base-uncased-emotion";

/// Configuration for the served model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Where to load the model from
    #[serde(default)]
    pub source: ModelSource,

    /// Inference device: cpu, cuda, metal
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum sequence length in tokens, longer inputs are truncated
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Label names overriding the model's `id2label`
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::default(),
            device: default_device(),
            max_length: default_max_length(),
            labels: Vec::new(),
        }
    }
}

impl ModelConfig {
    /// Config for a hub repository at `main`
    pub fn huggingface(repo: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo: repo.into(),
                revision: default_revision(),
            },
            ..Default::default()
        }
    }

    /// Config for a model directory on disk
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::Local { path: path.into() },
            ..Default::default()
        }
    }

    /// Identifier used in logs and status output
    pub fn model_id(&self) -> String {
        match &self.source {
            ModelSource::HuggingFace { repo, revision } if revision == "main" => repo.clone(),
            ModelSource::HuggingFace { repo, revision } => format!("{}@{}", repo, revision),
            ModelSource::Local { path } => path.display().to_string(),
        }
    }

    /// Reject values that can never load
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(Error::config("model.max_length must be greater than 0"));
        }

        if let ModelSource::HuggingFace { repo, .. } = &self.source {
            if repo.trim().is_empty() {
                return Err(Error::config("model.source.repo must not be empty"));
            }
        }

        Ok(())
    }
}

/// Model source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load from local filesystem
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::HuggingFace {
            repo: DEFAULT_MODEL_REPO.to_string(),
            revision: default_revision(),
        }
    }
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}
