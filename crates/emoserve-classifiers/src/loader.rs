//! Model loading from the Hugging Face hub or local disk

use async_trait::async_trait;
use emoserve_core::{Error, Result};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use std::sync::Arc;

use crate::classifier::TextClassifier;
use crate::distilbert::DistilBertClassifier;
use crate::model_config::{ModelConfig, ModelSource};

/// Builds the classification pipeline served by the adapter.
///
/// Implementations may block on network and disk; the adapter calls
/// `load` exactly once.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Fetch the model artifact and build a classifier
    async fn load(&self) -> Result<Arc<dyn TextClassifier>>;

    /// Identifier of the model this loader produces
    fn model_id(&self) -> String;
}

/// Loads a DistilBERT sequence classifier described by a [`ModelConfig`]
pub struct HubModelLoader {
    config: ModelConfig,
}

impl HubModelLoader {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

#[async_trait]
impl ModelLoader for HubModelLoader {
    async fn load(&self) -> Result<Arc<dyn TextClassifier>> {
        let config = self.config.clone();
        let model_id = self.model_id();

        tracing::info!("Loading model '{}'", model_id);

        let classifier = tokio::task::spawn_blocking(move || {
            let model_path = resolve_model_path(&config.source)?;
            DistilBertClassifier::load_from_dir(model_id, &model_path, &config)
        })
        .await
        .map_err(|e| Error::internal(format!("Model loading task failed: {}", e)))??;

        Ok(Arc::new(classifier))
    }

    fn model_id(&self) -> String {
        self.config.model_id()
    }
}

fn resolve_model_path(source: &ModelSource) -> Result<PathBuf> {
    match source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(Error::classifier(format!(
                    "Model path does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace { repo, revision } => download_from_huggingface(repo, revision),
    }
}

fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    tracing::info!("Downloading model from HuggingFace: {} ({})", repo, revision);

    let api = Api::new()
        .map_err(|e| Error::classifier(format!("Failed to initialize HuggingFace API: {}", e)))?;

    let repo_obj = api.repo(Repo::with_revision(
        repo.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    let config_path = repo_obj
        .get("config.json")
        .map_err(|e| Error::classifier(format!("Failed to download config.json: {}", e)))?;

    let weight_files = ["model.safetensors", "pytorch_model.bin"];
    let found_weights = weight_files.iter().any(|file| match repo_obj.get(file) {
        Ok(_) => {
            tracing::debug!("Found weight file: {}", file);
            true
        }
        Err(e) => {
            tracing::debug!("Weight file {} unavailable: {}", file, e);
            false
        }
    });

    if !found_weights {
        return Err(Error::classifier(
            "No model weights found (tried model.safetensors, pytorch_model.bin)",
        ));
    }

    let tokenizer_files = ["tokenizer.json", "vocab.txt"];
    let mut found_tokenizer = false;
    for file in &tokenizer_files {
        match repo_obj.get(file) {
            Ok(_) => {
                tracing::debug!("Found tokenizer file: {}", file);
                found_tokenizer = true;
            }
            Err(_) => {
                tracing::debug!("File not found: {}", file);
            }
        }
    }

    if !found_tokenizer {
        return Err(Error::classifier(
            "No tokenizer found (tried tokenizer.json, vocab.txt)",
        ));
    }

    let model_dir = config_path
        .parent()
        .ok_or_else(|| Error::classifier("Invalid cache path"))?;

    tracing::info!("Model available at: {}", model_dir.display());
    Ok(model_dir.to_path_buf())
}
