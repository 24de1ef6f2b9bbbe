//! Three-class sentiment on top of a binary classifier

use sentimentscope_core::{Result, SentimentLabel, DEFAULT_NEUTRAL_THRESHOLD};
use serde::Serialize;
use std::sync::Arc;

use crate::classifier::Classifier;

/// Sentiment assigned to one text
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentVerdict {
    pub label: SentimentLabel,
    pub confidence: f32,
}

/// Wraps a pretrained binary classifier and remaps low-confidence verdicts
/// to [`SentimentLabel::Neutral`]
#[derive(Clone)]
pub struct SentimentAdapter {
    classifier: Arc<dyn Classifier>,
    neutral_threshold: f32,
}

impl SentimentAdapter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            neutral_threshold: DEFAULT_NEUTRAL_THRESHOLD,
        }
    }

    /// Override the confidence below which verdicts become neutral
    pub fn with_neutral_threshold(mut self, threshold: f32) -> Self {
        self.neutral_threshold = threshold;
        self
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify `text`. The reported confidence is the model's score for its
    /// own label, also when the label was remapped to neutral.
    pub async fn analyze(&self, text: &str) -> Result<SentimentVerdict> {
        let result = self.classifier.classify(text).await?;
        let confidence = result.score.clamp(0.0, 1.0);
        let label = SentimentLabel::from_binary(&result.label, confidence, self.neutral_threshold)?;

        metrics::histogram!("sentimentscope_classification_latency_us")
            .record(result.latency_us as f64);

        Ok(SentimentVerdict { label, confidence })
    }
}
