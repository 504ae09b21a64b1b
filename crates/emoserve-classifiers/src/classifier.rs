//! Classifier trait and common types

use async_trait::async_trait;
use emoserve_core::{LabelScore, Result};
use std::time::Instant;

/// Trait for text classification pipelines
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify the given text, returning a score for every label
    async fn classify(&self, text: &str) -> Result<ClassificationResult>;

    /// Classify several texts, one result per text in input order
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<ClassificationResult>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.classify(text).await?);
        }
        Ok(results)
    }

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Labels this classifier scores, in model output order
    fn labels(&self) -> &[String];
}

/// Result of classifying one text
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Every label with its probability, highest first
    pub scores: Vec<LabelScore>,

    /// Model name or version
    pub model: Option<String>,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Build a result from raw probabilities in label order
    ///
    /// Labels without a probability get 0.0. Scores are sorted descending,
    /// ties keep label order.
    pub fn from_probabilities(labels: &[String], probs: &[f32], start: Instant) -> Self {
        let mut scores: Vec<LabelScore> = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| LabelScore::new(label.clone(), probs.get(idx).copied().unwrap_or(0.0)))
            .collect();

        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Self {
            scores,
            model: None,
            latency_us: start.elapsed().as_micros() as u64,
        }
    }

    /// Attach the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Highest scoring label
    pub fn top(&self) -> Option<&LabelScore> {
        self.scores.first()
    }

    /// Score of a specific label
    pub fn score_of(&self, label: &str) -> Option<f32> {
        self.scores.iter().find(|s| s.label == label).map(|s| s.score)
    }

    /// Consume into the label scores
    pub fn into_scores(self) -> Vec<LabelScore> {
        self.scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["sadness", "joy", "love", "anger", "fear", "surprise"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_from_probabilities_sorts_descending() {
        let probs = [0.05, 0.80, 0.05, 0.04, 0.03, 0.03];
        let result = ClassificationResult::from_probabilities(&labels(), &probs, Instant::now());

        assert_eq!(result.scores.len(), 6);
        assert_eq!(result.top().unwrap().label, "joy");
        assert!(result
            .scores
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_missing_probabilities_default_to_zero() {
        let result = ClassificationResult::from_probabilities(&labels(), &[1.0], Instant::now());
        assert_eq!(result.scores.len(), 6);
        assert_eq!(result.score_of("sadness"), Some(1.0));
        assert_eq!(result.score_of("surprise"), Some(0.0));
    }

    #[test]
    fn test_with_model() {
        let result = ClassificationResult::from_probabilities(&labels(), &[0.5, 0.5], Instant::now())
            .with_model("emotion");
        assert_eq!(result.model.as_deref(), Some("emotion"));
    }
}
