//! emoserve Classifiers
//!
//! Text classification pipeline behind the inference endpoint.
//!
//! A [`ModelLoader`] fetches a pretrained sequence-classification model
//! (from the Hugging Face hub or a local directory) and builds a
//! [`TextClassifier`] that returns the full probability distribution over
//! the model's labels for every input text.

pub mod classifier;
pub mod distilbert;
pub mod loader;
pub mod model_config;

pub use classifier::{ClassificationResult, TextClassifier};
pub use distilbert::DistilBertClassifier;
pub use loader::{HubModelLoader, ModelLoader};
pub use model_config::{ModelConfig, ModelSource, DEFAULT_MODEL_REPO};
