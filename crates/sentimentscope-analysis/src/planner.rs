//! Adaptive topic-model parameters and the two-tier retry

use serde::Serialize;

use crate::topic_model::{TopicFit, TopicModel, TopicModelParams, VectorizerParams};

const MAX_FEATURES: usize = 500;
const TOP_N_WORDS: usize = 10;
const MIN_TOPICS: usize = 3;
const MAX_TOPICS: usize = 8;
const MIN_TOPIC_SIZE_FLOOR: usize = 5;

/// Which parameter set a fitting attempt uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attempt {
    /// Unigrams and bigrams with corpus-size dependent pruning
    Primary,
    /// Unigrams only, no document-frequency pruning
    Simplified,
}

impl Attempt {
    /// Attempt to run after this one fails
    pub fn next(self) -> Option<Attempt> {
        match self {
            Self::Primary => Some(Self::Simplified),
            Self::Simplified => None,
        }
    }
}

/// Parameters for both attempts, derived from the corpus size
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicPlan {
    pub doc_count: usize,
    pub primary: TopicModelParams,
    pub simplified: TopicModelParams,
}

impl TopicPlan {
    /// Choose parameters for a corpus of `doc_count` cleaned documents.
    ///
    /// Pruning tiers: under 10 documents keep everything, under 20 require
    /// two documents and drop terms in over 90% of them, otherwise require
    /// three and drop terms in over 80%. The topic count is `n / 10` bounded
    /// to [3, 8]; the minimum topic size is `n / 20`, at least 5.
    pub fn for_corpus(doc_count: usize) -> Self {
        let (min_df, max_df) = match doc_count {
            n if n < 10 => (1, 1.0),
            n if n < 20 => (2, 0.9),
            _ => (3, 0.8),
        };

        let nr_topics = (doc_count / 10).clamp(MIN_TOPICS, MAX_TOPICS);
        let min_topic_size = (doc_count / 20).max(MIN_TOPIC_SIZE_FLOOR);

        let primary = TopicModelParams {
            nr_topics,
            min_topic_size,
            top_n_words: TOP_N_WORDS,
            vectorizer: VectorizerParams {
                min_df,
                max_df,
                max_features: Some(MAX_FEATURES),
                ngram_range: (1, 2),
            },
        };

        let simplified = TopicModelParams {
            vectorizer: VectorizerParams {
                min_df: 1,
                max_df: 1.0,
                max_features: Some(MAX_FEATURES),
                ngram_range: (1, 1),
            },
            ..primary.clone()
        };

        Self {
            doc_count,
            primary,
            simplified,
        }
    }

    pub fn params(&self, attempt: Attempt) -> &TopicModelParams {
        match attempt {
            Attempt::Primary => &self.primary,
            Attempt::Simplified => &self.simplified,
        }
    }
}

/// Result of [`fit_with_retry`]
#[derive(Debug)]
pub enum FitOutcome {
    Fitted { fit: TopicFit, attempt: Attempt },
    /// Every attempt failed; one message per attempt, in order
    Failed { errors: Vec<(Attempt, String)> },
}

/// Fit with the primary parameters, then once more with the simplified ones
pub fn fit_with_retry(model: &dyn TopicModel, docs: &[String], plan: &TopicPlan) -> FitOutcome {
    let mut errors = Vec::new();
    let mut attempt = Some(Attempt::Primary);

    while let Some(current) = attempt {
        match model.fit_transform(docs, plan.params(current)) {
            Ok(fit) => {
                return FitOutcome::Fitted {
                    fit,
                    attempt: current,
                }
            }
            Err(e) => {
                tracing::warn!(attempt = ?current, error = %e, "Topic model attempt failed");
                errors.push((current, e.to_string()));
                attempt = current.next();
            }
        }
    }

    FitOutcome::Failed { errors }
}
