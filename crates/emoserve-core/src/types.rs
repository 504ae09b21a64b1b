//! Prediction request/response schema

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Body of a prediction request: `{"input": "..."}` or `{"input": ["...", "..."]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Text to classify
    pub input: PredictInput,
}

impl PredictRequest {
    /// Create a request for a single text
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            input: PredictInput::Single(text.into()),
        }
    }

    /// Create a request for several texts
    pub fn batch<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: PredictInput::Batch(texts.into_iter().map(Into::into).collect()),
        }
    }
}

/// A single text or a list of texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictInput {
    Single(String),
    Batch(Vec<String>),
}

impl PredictInput {
    /// Number of input items
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(items) => items.len(),
        }
    }

    /// Whether there are no input items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the input items in order
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::Single(text) => vec![text.as_str()],
            Self::Batch(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Consume into the owned input items
    pub fn into_texts(self) -> Vec<String> {
        match self {
            Self::Single(text) => vec![text],
            Self::Batch(items) => items,
        }
    }
}

/// One label with its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,

    /// Probability (0.0-1.0)
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Body of a prediction response
///
/// `predictions[i]` holds the scores of every label for input item `i`,
/// sorted by descending score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Vec<LabelScore>>,
}

/// Limits applied to prediction input before it reaches the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputLimits {
    /// Maximum number of items in one request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum characters per item
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Maximum HTTP body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_input_chars: default_max_input_chars(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl InputLimits {
    /// Check input against the limits
    ///
    /// Rejects empty batches, oversized batches, blank items and items
    /// longer than `max_input_chars`.
    pub fn validate(&self, input: &PredictInput) -> Result<()> {
        if input.is_empty() {
            return Err(Error::invalid_input("input must contain at least one text"));
        }

        if input.len() > self.max_batch_size {
            return Err(Error::invalid_input(format!(
                "input has {} items, maximum is {}",
                input.len(),
                self.max_batch_size
            )));
        }

        for (idx, text) in input.texts().iter().enumerate() {
            if text.trim().is_empty() {
                return Err(Error::invalid_input(format!("input[{}] is empty", idx)));
            }

            let chars = text.chars().count();
            if chars > self.max_input_chars {
                return Err(Error::invalid_input(format!(
                    "input[{}] has {} characters, maximum is {}",
                    idx, chars, self.max_input_chars
                )));
            }
        }

        Ok(())
    }
}

fn default_max_batch_size() -> usize {
    32
}

fn default_max_input_chars() -> usize {
    10_000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}
