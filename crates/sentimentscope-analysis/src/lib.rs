//! SentimentScope Analysis
//!
//! Everything that turns review text into labels:
//!
//! - Text normalization shared by the sentiment and topic passes
//! - A [`Classifier`] seam with a candle DistilBERT implementation and the
//!   three-class [`SentimentAdapter`]
//! - Sentence embeddings ([`Embedder`]) backed by a MiniLM BERT model
//! - Single-text topic extraction over a heuristic tagger
//! - Per-phone topic modeling on aprender's count vectorizer and k-means,
//!   with class-based TF-IDF, adaptive parameters and a two-tier retry

pub mod classifier;
pub mod distilbert;
pub mod embedding;
pub mod keywords;
pub mod model_loader;
pub mod normalize;
pub mod phrasing;
pub mod planner;
pub mod sentiment;
pub mod tagger;
pub mod topic_model;

pub use classifier::{ClassificationResult, Classifier};
pub use distilbert::DistilBertClassifier;
pub use embedding::{Embedder, MiniLmEmbedder};
pub use keywords::extract_text_topics;
pub use model_loader::{DeviceType, ModelConfig};
pub use normalize::{normalize, word_count, MIN_TEXT_LEN};
pub use phrasing::{format_terms, join_phrase, make_topic_label};
pub use planner::{fit_with_retry, Attempt, FitOutcome, TopicPlan};
pub use sentiment::{SentimentAdapter, SentimentVerdict};
pub use tagger::{LexiconTagger, PartOfSpeech, TaggedToken, Tagger};
pub use topic_model::{
    ClusterTopicModel, Topic, TopicFit, TopicModel, TopicModelParams, VectorizerParams,
    OUTLIER_TOPIC,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, Classifier};
    pub use crate::embedding::Embedder;
    pub use crate::normalize::normalize;
    pub use crate::sentiment::{SentimentAdapter, SentimentVerdict};
    pub use crate::tagger::{LexiconTagger, Tagger};
    pub use crate::topic_model::{TopicFit, TopicModel};
}
