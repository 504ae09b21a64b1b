//! Mock classifiers for testing
//!
//! Exercises the default batch behavior of the TextClassifier trait and the
//! ModelLoader seam without downloading a model.

use async_trait::async_trait;
use emoserve_classifiers::{ClassificationResult, ModelLoader, TextClassifier};
use emoserve_core::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

const EMOTIONS: [&str; 6] = ["sadness", "joy", "love", "anger", "fear", "surprise"];

/// Keyword-driven classifier over the six emotion labels
pub struct MockEmotionClassifier {
    labels: Vec<String>,
    call_count: AtomicU32,
}

impl MockEmotionClassifier {
    pub fn new() -> Self {
        Self {
            labels: EMOTIONS.iter().map(|s| s.to_string()).collect(),
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextClassifier for MockEmotionClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if text.contains("FAIL") {
            return Err(Error::classifier("simulated forward failure"));
        }

        let hot = if text.contains("happy") {
            1
        } else if text.contains("angry") {
            3
        } else {
            0
        };

        let mut probs = vec![0.04f32; self.labels.len()];
        probs[hot] = 0.80;

        Ok(ClassificationResult::from_probabilities(&self.labels, &probs, Instant::now()))
    }

    fn name(&self) -> &str {
        "mock-emotion"
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

struct MockLoader;

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load(&self) -> Result<Arc<dyn TextClassifier>> {
        Ok(Arc::new(MockEmotionClassifier::new()))
    }

    fn model_id(&self) -> String {
        "mock/emotion".to_string()
    }
}

#[tokio::test]
async fn test_classify_returns_every_label() {
    let classifier = MockEmotionClassifier::new();
    let result = classifier.classify("I am so happy today").await.unwrap();

    assert_eq!(result.scores.len(), EMOTIONS.len());
    assert_eq!(result.top().unwrap().label, "joy");

    let total: f32 = result.scores.iter().map(|s| s.score).sum();
    assert!((total - 1.0).abs() < 1e-4);
    assert!(result.scores.iter().all(|s| (0.0..=1.0).contains(&s.score)));
}

#[tokio::test]
async fn test_classify_batch_preserves_order_and_count() {
    let classifier = MockEmotionClassifier::new();
    let texts = vec![
        "I am so happy today".to_string(),
        "I am angry".to_string(),
        "meh".to_string(),
    ];

    let results = classifier.classify_batch(&texts).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].top().unwrap().label, "joy");
    assert_eq!(results[1].top().unwrap().label, "anger");
    assert_eq!(results[2].top().unwrap().label, "sadness");
    assert_eq!(classifier.call_count(), 3);
}

#[tokio::test]
async fn test_classify_batch_stops_at_first_error() {
    let classifier = MockEmotionClassifier::new();
    let texts = vec!["FAIL".to_string(), "I am so happy today".to_string()];

    let err = classifier.classify_batch(&texts).await.unwrap_err();

    assert!(matches!(err, Error::Classifier(_)));
    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test]
async fn test_loader_produces_shared_classifier() {
    let loader = MockLoader;
    let classifier = loader.load().await.unwrap();

    assert_eq!(loader.model_id(), "mock/emotion");
    assert_eq!(classifier.labels().len(), EMOTIONS.len());
    assert_eq!(classifier.name(), "mock-emotion");
}
