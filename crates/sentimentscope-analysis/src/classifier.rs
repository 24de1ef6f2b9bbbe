//! Classifier trait and common types

use async_trait::async_trait;
use sentimentscope_core::Result;

/// Trait for all text classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text
    async fn classify(&self, text: &str) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Raw model label, e.g. `POSITIVE`
    pub label: String,

    /// Confidence of `label` (0.0-1.0)
    pub score: f32,

    /// Model name or version
    pub model: Option<String>,

    /// All class scores
    pub all_scores: Vec<(String, f32)>,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a new classification result
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
            model: None,
            all_scores: Vec::new(),
            latency_us: 0,
        }
    }

    /// Build a result from a probability vector, picking the arg-max label
    pub fn from_probabilities(labels: &[String], probs: &[f32]) -> Self {
        let (max_idx, max_prob) = probs
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, 0.0));

        let label = labels
            .get(max_idx)
            .cloned()
            .unwrap_or_else(|| format!("label_{}", max_idx));

        let all_scores = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), probs.get(idx).copied().unwrap_or(0.0)))
            .collect();

        Self {
            label,
            score: max_prob,
            model: None,
            all_scores,
            latency_us: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_probabilities_picks_argmax() {
        let labels = vec!["NEGATIVE".to_string(), "POSITIVE".to_string()];
        let result = ClassificationResult::from_probabilities(&labels, &[0.2, 0.8]);

        assert_eq!(result.label, "POSITIVE");
        assert!((result.score - 0.8).abs() < 1e-6);
        assert_eq!(result.all_scores.len(), 2);
    }

    #[test]
    fn test_from_probabilities_unnamed_label() {
        let result = ClassificationResult::from_probabilities(&[], &[0.1, 0.9]);
        assert_eq!(result.label, "label_1");
    }
}
