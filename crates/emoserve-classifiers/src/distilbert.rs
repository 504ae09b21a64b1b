//! DistilBERT sequence classification on Candle

use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use emoserve_core::{Error, Result};
use std::path::Path;
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationParams};

use crate::classifier::{ClassificationResult, TextClassifier};
use crate::model_config::ModelConfig;

/// DistilBERT backbone with the `pre_classifier` and `classifier` heads of
/// `DistilBertForSequenceClassification`
pub struct DistilBertClassifier {
    name: String,
    tokenizer: Tokenizer,
    model: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    device: Device,
    labels: Vec<String>,
}

impl DistilBertClassifier {
    /// Load a classifier from a directory holding `config.json`, weights and
    /// tokenizer files
    pub fn load_from_dir(
        name: impl Into<String>,
        model_path: &Path,
        config: &ModelConfig,
    ) -> Result<Self> {
        let name = name.into();
        let config_path = model_path.join("config.json");
        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::classifier(format!(
                "Failed to read config {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let config_json: serde_json::Value = serde_json::from_str(&config_str).map_err(|e| {
            Error::classifier(format!("Failed to parse config JSON: {}", e))
        })?;

        let hidden_size = config_json
            .get("dim")
            .or_else(|| config_json.get("hidden_size"))
            .and_then(|v| v.as_u64())
            .unwrap_or(768) as usize;

        let labels = resolve_labels(&config.labels, &parse_id2label(&config_json));
        if labels.is_empty() {
            return Err(Error::classifier(
                "Model config has no id2label and no labels were configured",
            ));
        }

        let distilbert_config: DistilBertConfig = serde_json::from_str(&config_str)
            .map_err(|e| Error::classifier(format!("Failed to parse DistilBERT config: {}", e)))?;

        let tokenizer = load_tokenizer(model_path, config.max_length)?;
        let device = get_device(&config.device)?;
        let vb = load_var_builder(model_path, &device)?;

        let model = DistilBertModel::load(vb.pp("distilbert"), &distilbert_config)
            .map_err(|e| Error::classifier(format!("Failed to load DistilBERT model: {}", e)))?;

        let pre_classifier = candle_nn::linear(hidden_size, hidden_size, vb.pp("pre_classifier"))
            .map_err(|e| {
                Error::classifier(format!(
                    "Failed to load pre_classifier (hidden_size={}): {}",
                    hidden_size, e
                ))
            })?;

        let classifier = candle_nn::linear(hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| {
                Error::classifier(format!(
                    "Failed to load classification head (num_labels={}): {}",
                    labels.len(),
                    e
                ))
            })?;

        tracing::info!(
            "Loaded DistilBERT classifier '{}' with {} labels: {:?}",
            name,
            labels.len(),
            labels
        );

        Ok(Self {
            name,
            tokenizer,
            model,
            pre_classifier,
            classifier,
            device,
            labels,
        })
    }

    fn forward(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::classifier(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<u32> = encoding.get_ids().to_vec();
        let input_ids = Tensor::new(input_ids.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::classifier(format!("Failed to create input tensor: {}", e)))?;

        // DistilBERT masks positions where the mask is 1
        let attention_mask_inverted: Vec<u8> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| if x == 0 { 1u8 } else { 0u8 })
            .collect();
        let attention_mask = Tensor::new(attention_mask_inverted.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::classifier(format!("Failed to create attention mask: {}", e)))?;

        let hidden_states = self
            .model
            .forward(&input_ids, &attention_mask)
            .map_err(|e| Error::classifier(format!("Model forward pass failed: {}", e)))?;

        let cls_embedding = hidden_states
            .i((0, 0, ..))
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::classifier(format!("Failed to get CLS token: {}", e)))?;

        let pooled_output = self
            .pre_classifier
            .forward(&cls_embedding)
            .and_then(|t| t.relu())
            .map_err(|e| Error::classifier(format!("Pre-classifier failed: {}", e)))?;

        let logits = self
            .classifier
            .forward(&pooled_output)
            .map_err(|e| Error::classifier(format!("Classification head failed: {}", e)))?;

        to_probabilities(&logits)
    }
}

#[async_trait]
impl TextClassifier for DistilBertClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let probs = self.forward(text)?;

        Ok(ClassificationResult::from_probabilities(&self.labels, &probs, start)
            .with_model(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

pub(crate) fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::classifier(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::classifier(format!("Failed to initialize Metal: {}", e))),
        "cpu" => Ok(Device::Cpu),
        other => Err(Error::config(format!("Unknown device '{}'", other))),
    }
}

/// Labels from `id2label`, ordered by index; gaps become `label_{i}`
pub(crate) fn parse_id2label(config_json: &serde_json::Value) -> Vec<String> {
    let Some(map) = config_json.get("id2label").and_then(|v| v.as_object()) else {
        return Vec::new();
    };

    let entries: Vec<(usize, String)> = map
        .iter()
        .filter_map(|(idx, label)| {
            let idx = idx.parse::<usize>().ok()?;
            Some((idx, label.as_str()?.to_string()))
        })
        .collect();

    let Some(max_idx) = entries.iter().map(|(idx, _)| *idx).max() else {
        return Vec::new();
    };

    let mut labels: Vec<String> = (0..=max_idx).map(|idx| format!("label_{}", idx)).collect();
    for (idx, label) in entries {
        labels[idx] = label;
    }
    labels
}

/// Configured labels win; padded with model labels when shorter
pub(crate) fn resolve_labels(configured: &[String], from_model: &[String]) -> Vec<String> {
    if configured.is_empty() {
        return from_model.to_vec();
    }

    let mut resolved = configured.to_vec();
    let missing = from_model.iter().skip(resolved.len()).cloned().collect::<Vec<_>>();
    resolved.extend(missing);
    resolved
}

fn load_var_builder(model_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors_path = model_path.join("model.safetensors");
    if safetensors_path.exists() {
        tracing::debug!("Loading weights from model.safetensors");
        // SAFETY: the file is memory-mapped read-only and held by the hub cache
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[safetensors_path], DType::F32, device)
                .map_err(|e| Error::classifier(format!("Failed to load weights: {}", e)))?
        };
        return Ok(vb);
    }

    let pth_path = model_path.join("pytorch_model.bin");
    if pth_path.exists() {
        tracing::debug!("Loading weights from pytorch_model.bin");
        return VarBuilder::from_pth(&pth_path, DType::F32, device)
            .map_err(|e| Error::classifier(format!("Failed to load weights: {}", e)));
    }

    Err(Error::classifier(format!(
        "No model weights found in {} (tried model.safetensors, pytorch_model.bin)",
        model_path.display()
    )))
}

pub(crate) fn load_tokenizer(model_path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = read_tokenizer(model_path)?;

    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::classifier(format!("Failed to configure truncation: {}", e)))?;

    Ok(tokenizer)
}

fn read_tokenizer(model_path: &Path) -> Result<Tokenizer> {
    let tokenizer_json_path = model_path.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(|e| Error::classifier(format!("Failed to load tokenizer.json: {}", e)));
    }

    let vocab_path = model_path.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| Error::classifier(format!("Failed to build WordPiece model: {}", e)))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

        let sep_id = tokenizer.token_to_id("[SEP]").unwrap_or(102);
        let cls_id = tokenizer.token_to_id("[CLS]").unwrap_or(101);
        tokenizer.with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), sep_id),
            ("[CLS]".to_string(), cls_id),
        )));

        return Ok(tokenizer);
    }

    Err(Error::classifier(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
        model_path.display()
    )))
}

fn to_probabilities(logits: &Tensor) -> Result<Vec<f32>> {
    candle_nn::ops::softmax(logits, D::Minus1)
        .and_then(|t| t.squeeze(0))
        .and_then(|t| t.to_dtype(DType::F32))
        .and_then(|t| t.to_vec1())
        .map_err(|e| Error::classifier(format!("Softmax failed: {}", e)))
}
