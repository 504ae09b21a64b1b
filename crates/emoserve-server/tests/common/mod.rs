//! Mock pipeline and loaders shared by the server tests

#![allow(dead_code)]

use async_trait::async_trait;
use emoserve_classifiers::{ClassificationResult, ModelLoader, TextClassifier};
use emoserve_core::{Error, InputLimits, Result};
use emoserve_server::{AppState, ModelAdapter};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const MODEL_NAME: &str = "bert-emotion-model";
pub const EMOTIONS: [&str; 6] = ["sadness", "joy", "love", "anger", "fear", "surprise"];

/// Keyword-driven stand-in for the emotion model
pub struct MockEmotionClassifier {
    labels: Vec<String>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockEmotionClassifier {
    pub fn new() -> Self {
        Self {
            labels: EMOTIONS.iter().map(|s| s.to_string()).collect(),
            latency: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Highest number of concurrent `classify` calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextClassifier for MockEmotionClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if text.contains("FAIL") {
            return Err(Error::classifier("simulated forward failure"));
        }

        let lower = text.to_lowercase();
        let hot = if lower.contains("happy") {
            1
        } else if lower.contains("love") {
            2
        } else if lower.contains("angry") {
            3
        } else if lower.contains("scared") {
            4
        } else {
            0
        };

        let mut probs = vec![0.02f32; self.labels.len()];
        probs[hot] = 0.90;

        Ok(ClassificationResult::from_probabilities(&self.labels, &probs, start))
    }

    fn name(&self) -> &str {
        "mock-emotion"
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Loader handing out a prepared classifier
pub struct MockLoader {
    classifier: Arc<MockEmotionClassifier>,
    calls: AtomicU32,
}

impl MockLoader {
    pub fn new(classifier: MockEmotionClassifier) -> Self {
        Self {
            classifier: Arc::new(classifier),
            calls: AtomicU32::new(0),
        }
    }

    pub fn classifier(&self) -> Arc<MockEmotionClassifier> {
        Arc::clone(&self.classifier)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load(&self) -> Result<Arc<dyn TextClassifier>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.classifier.clone())
    }

    fn model_id(&self) -> String {
        "mock/emotion".to_string()
    }
}

/// Loader whose artifact can never be fetched
pub struct FailingLoader;

#[async_trait]
impl ModelLoader for FailingLoader {
    async fn load(&self) -> Result<Arc<dyn TextClassifier>> {
        Err(Error::classifier("Failed to download config.json: 404"))
    }

    fn model_id(&self) -> String {
        "missing/model".to_string()
    }
}

pub fn adapter() -> ModelAdapter {
    ModelAdapter::new(MODEL_NAME, InputLimits::default(), 1)
}

pub async fn ready_adapter() -> Arc<ModelAdapter> {
    let adapter = adapter();
    adapter
        .load(&MockLoader::new(MockEmotionClassifier::new()))
        .await
        .unwrap();
    Arc::new(adapter)
}

pub async fn ready_state() -> AppState {
    AppState::new(ready_adapter().await)
}
