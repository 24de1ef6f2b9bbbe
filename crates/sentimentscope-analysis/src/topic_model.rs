//! Per-phone topic modeling.
//!
//! [`ClusterTopicModel`] embeds documents, groups them with aprender's
//! k-means, treats clusters smaller than the minimum topic size as outliers,
//! and describes each remaining cluster with its highest class-based TF-IDF
//! terms over aprender's count vectorizer.

use aprender::cluster::KMeans;
use aprender::primitives::Matrix;
use aprender::text::tokenize::WhitespaceTokenizer;
use aprender::text::vectorize::CountVectorizer;
use aprender::traits::UnsupervisedEstimator;
use sentimentscope_core::{Error, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::embedding::{cosine_similarity, Embedder};

/// Topic id assigned to documents that belong to no topic
pub const OUTLIER_TOPIC: i32 = -1;

/// Vocabulary construction parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorizerParams {
    /// Terms must appear in at least this many documents
    pub min_df: usize,
    /// Terms may appear in at most this share of documents (0.0-1.0)
    pub max_df: f32,
    /// Keep only the most frequent terms
    pub max_features: Option<usize>,
    /// Inclusive n-gram range, e.g. `(1, 2)` for unigrams and bigrams
    pub ngram_range: (usize, usize),
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            min_df: 1,
            max_df: 1.0,
            max_features: None,
            ngram_range: (1, 1),
        }
    }
}

/// Parameters for one fitting attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicModelParams {
    /// Upper bound on the number of topics
    pub nr_topics: usize,
    /// Clusters smaller than this become outliers
    pub min_topic_size: usize,
    /// Words kept per topic
    pub top_n_words: usize,
    pub vectorizer: VectorizerParams,
}

/// One discovered topic
#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub id: i32,
    /// Terms with their c-TF-IDF weight, best first
    pub words: Vec<(String, f32)>,
    /// Number of documents assigned to the topic
    pub size: usize,
}

/// Outcome of fitting a corpus
#[derive(Debug, Clone, Default)]
pub struct TopicFit {
    /// Topic id per document, [`OUTLIER_TOPIC`] for noise
    pub assignments: Vec<i32>,
    /// Topics ordered by id (outlier excluded)
    pub topics: Vec<Topic>,
    /// `probabilities[doc][topic id]`, when the model provides them
    pub probabilities: Option<Vec<Vec<f32>>>,
}

impl TopicFit {
    /// Indices of the documents assigned to `topic_id`
    pub fn members(&self, topic_id: i32) -> impl Iterator<Item = usize> + '_ {
        self.assignments
            .iter()
            .enumerate()
            .filter(move |(_, &t)| t == topic_id)
            .map(|(i, _)| i)
    }

    /// Probability that `doc` belongs to `topic_id`, or `fallback` when the
    /// model gave no probabilities. Always within [0, 1].
    pub fn relevance(&self, doc: usize, topic_id: i32, fallback: f32) -> f32 {
        let score = usize::try_from(topic_id)
            .ok()
            .and_then(|t| self.probabilities.as_ref()?.get(doc)?.get(t).copied())
            .unwrap_or(fallback);
        score.clamp(0.0, 1.0)
    }
}

/// An unsupervised topic model over short documents
pub trait TopicModel: Send + Sync {
    /// Fit `docs` and assign each one a topic
    fn fit_transform(&self, docs: &[String], params: &TopicModelParams) -> Result<TopicFit>;

    /// Model name
    fn name(&self) -> &str;
}

/// Embedding clusters described by class-based TF-IDF
pub struct ClusterTopicModel {
    embedder: Arc<dyn Embedder>,
    seed: u64,
    temperature: f32,
}

impl ClusterTopicModel {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            seed: 42,
            temperature: 0.1,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Softmax temperature for document-topic probabilities
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }
}

impl TopicModel for ClusterTopicModel {
    fn fit_transform(&self, docs: &[String], params: &TopicModelParams) -> Result<TopicFit> {
        if docs.len() < 2 {
            return Err(Error::topic_model(format!(
                "need at least 2 documents, got {}",
                docs.len()
            )));
        }

        let terms = count_terms(docs, &params.vectorizer)?;

        let embeddings = self.embedder.embed_batch(docs)?;
        if embeddings.len() != docs.len() {
            return Err(Error::topic_model(format!(
                "embedder returned {} vectors for {} documents",
                embeddings.len(),
                docs.len()
            )));
        }

        let k = (docs.len() / params.min_topic_size.max(1))
            .min(params.nr_topics)
            .clamp(1, docs.len());
        let (labels, centroids) = cluster(&embeddings, k, self.seed)?;

        // Keep clusters that are large enough, largest first.
        let mut sizes = vec![0usize; centroids.len()];
        for &label in &labels {
            sizes[label] += 1;
        }
        let mut kept: Vec<usize> = (0..sizes.len())
            .filter(|&c| sizes[c] >= params.min_topic_size)
            .collect();
        kept.sort_by(|a, b| sizes[*b].cmp(&sizes[*a]).then(a.cmp(b)));

        let assignments: Vec<i32> = labels
            .iter()
            .map(|&label| {
                kept.iter()
                    .position(|&c| c == label)
                    .map_or(OUTLIER_TOPIC, |t| t as i32)
            })
            .collect();

        tracing::debug!(
            docs = docs.len(),
            clusters = k,
            topics = kept.len(),
            vocabulary = terms.vocabulary.len(),
            "Clustered documents"
        );

        if kept.is_empty() {
            return Ok(TopicFit {
                assignments,
                topics: Vec::new(),
                probabilities: None,
            });
        }

        let words = class_tfidf(&terms, &assignments, kept.len(), params.top_n_words);
        let topics = words
            .into_iter()
            .enumerate()
            .map(|(t, words)| Topic {
                id: t as i32,
                words,
                size: sizes[kept[t]],
            })
            .collect();

        let topic_centroids: Vec<&Vec<f32>> = kept.iter().map(|&c| &centroids[c]).collect();
        let probabilities = embeddings
            .iter()
            .map(|embedding| {
                let sims: Vec<f32> = topic_centroids
                    .iter()
                    .map(|c| cosine_similarity(embedding, c))
                    .collect();
                softmax(&sims, self.temperature)
            })
            .collect();

        Ok(TopicFit {
            assignments,
            topics,
            probabilities: Some(probabilities),
        })
    }

    fn name(&self) -> &str {
        "cluster-ctfidf"
    }
}

/// Document-term counts with the vocabulary in column order
struct TermCounts {
    vocabulary: Vec<String>,
    counts: Matrix<f64>,
}

/// Count terms with aprender's vectorizer. Documents are normalized text, so
/// whitespace tokenization is enough; n-grams come back joined by `_` and
/// are reported with spaces.
fn count_terms(docs: &[String], params: &VectorizerParams) -> Result<TermCounts> {
    if (params.max_df as f64 * docs.len() as f64) < params.min_df as f64 {
        return Err(Error::vectorizer(
            "max_df corresponds to fewer documents than min_df",
        ));
    }

    let mut vectorizer = CountVectorizer::new()
        .with_tokenizer(Box::new(WhitespaceTokenizer::new()))
        .with_stop_words_english()
        .with_ngram_range(params.ngram_range.0, params.ngram_range.1)
        .with_min_df(params.min_df)
        .with_max_df(params.max_df);
    if let Some(max_features) = params.max_features {
        vectorizer = vectorizer.with_max_features(max_features);
    }

    vectorizer
        .fit(docs)
        .map_err(|e| Error::vectorizer(e.to_string()))?;
    if vectorizer.vocabulary_size() == 0 {
        return Err(Error::vectorizer(
            "after pruning, no terms remain; try a lower min_df or a higher max_df",
        ));
    }
    let counts = vectorizer
        .transform(docs)
        .map_err(|e| Error::vectorizer(e.to_string()))?;

    let mut vocabulary = vec![String::new(); vectorizer.vocabulary_size()];
    for (term, &column) in vectorizer.vocabulary() {
        vocabulary[column] = term.replace('_', " ");
    }

    Ok(TermCounts { vocabulary, counts })
}

/// Seeded k-means over the embeddings; labels per document and centroids
fn cluster(embeddings: &[Vec<f32>], k: usize, seed: u64) -> Result<(Vec<usize>, Vec<Vec<f32>>)> {
    let dim = embeddings.first().map_or(0, Vec::len);
    if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
        return Err(Error::topic_model("embeddings have inconsistent dimensions"));
    }

    let data: Vec<f32> = embeddings.iter().flatten().copied().collect();
    let samples = Matrix::from_vec(embeddings.len(), dim, data)
        .map_err(|e| Error::topic_model(e.to_string()))?;

    let mut kmeans = KMeans::new(k).with_random_state(seed);
    kmeans
        .fit(&samples)
        .map_err(|e| Error::topic_model(format!("k-means failed: {e}")))?;

    let labels = kmeans.predict(&samples);
    let centroids = kmeans
        .centroids()
        .as_slice()
        .chunks(dim)
        .map(<[f32]>::to_vec)
        .collect();
    Ok((labels, centroids))
}

/// Top terms per topic by class-based TF-IDF.
///
/// Documents of a topic are merged into one class; outliers form an extra
/// class that only contributes to term frequencies. The weight of term `x`
/// in class `c` is `tf(x, c) / |c| * ln(1 + A / f(x))` with `A` the average
/// number of terms per class and `f(x)` the frequency of `x` over all classes.
fn class_tfidf(
    terms: &TermCounts,
    assignments: &[i32],
    n_topics: usize,
    top_n: usize,
) -> Vec<Vec<(String, f32)>> {
    let n_terms = terms.vocabulary.len();
    let has_outliers = assignments.iter().any(|&t| t < 0);
    let n_classes = n_topics + usize::from(has_outliers);

    let mut class_tf = vec![vec![0.0f32; n_terms]; n_classes];
    for (doc, &topic) in assignments.iter().enumerate() {
        let class = usize::try_from(topic).unwrap_or(n_topics);
        for (w, acc) in class_tf[class].iter_mut().enumerate() {
            *acc += terms.counts.get(doc, w) as f32;
        }
    }

    let total: f32 = class_tf.iter().flatten().sum();
    let avg_words = total / n_classes as f32;
    let term_freq: Vec<f32> = (0..n_terms)
        .map(|w| class_tf.iter().map(|class| class[w]).sum())
        .collect();

    class_tf
        .iter()
        .take(n_topics)
        .map(|tf| {
            let class_total: f32 = tf.iter().sum();
            let mut scored: Vec<(String, f32)> = tf
                .iter()
                .enumerate()
                .filter(|(w, &count)| count > 0.0 && term_freq[*w] > 0.0)
                .map(|(w, &count)| {
                    let idf = (1.0 + avg_words / term_freq[w]).ln();
                    (terms.vocabulary[w].clone(), count / class_total * idf)
                })
                .collect();
            scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            scored.truncate(top_n);
            scored
        })
        .collect()
}

fn softmax(values: &[f32], temperature: f32) -> Vec<f32> {
    let t = temperature.max(f32::EPSILON);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| ((v - max) / t).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds by keyword: battery talk and camera talk land far apart.
    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let battery = text.matches("battery").count() as f32;
            let camera = text.matches("camera").count() as f32;
            let mut v = vec![battery + 0.01, camera + 0.01];
            crate::embedding::l2_normalize(&mut v);
            Ok(v)
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    fn params(min_df: usize) -> TopicModelParams {
        TopicModelParams {
            nr_topics: 3,
            min_topic_size: 5,
            top_n_words: 10,
            vectorizer: VectorizerParams {
                min_df,
                max_df: 1.0,
                max_features: Some(500),
                ngram_range: (1, 2),
            },
        }
    }

    fn corpus() -> Vec<String> {
        let mut docs = Vec::new();
        for i in 0..6 {
            docs.push(format!("battery drains quickly after update number{}", i));
        }
        for i in 0..6 {
            docs.push(format!("camera photos look sharp outdoors shot{}", i));
        }
        docs
    }

    #[test]
    fn test_two_topics_are_found() {
        let model = ClusterTopicModel::new(Arc::new(KeywordEmbedder));
        let fit = model.fit_transform(&corpus(), &params(2)).unwrap();

        assert_eq!(fit.topics.len(), 2);
        assert!(fit.assignments.iter().all(|&t| t >= 0));
        assert_eq!(fit.members(0).count() + fit.members(1).count(), 12);

        let battery_topic = fit.assignments[0];
        let camera_topic = fit.assignments[6];
        assert_ne!(battery_topic, camera_topic);

        let battery_words: Vec<&str> = fit.topics[battery_topic as usize]
            .words
            .iter()
            .map(|(w, _)| w.as_str())
            .collect();
        assert!(battery_words.contains(&"battery"));
        assert!(!battery_words.contains(&"camera"));
    }

    #[test]
    fn test_probabilities_favor_assigned_topic() {
        let model = ClusterTopicModel::new(Arc::new(KeywordEmbedder));
        let fit = model.fit_transform(&corpus(), &params(2)).unwrap();

        let topic = fit.assignments[0];
        let other = 1 - topic;
        assert!(fit.relevance(0, topic, 0.5) > fit.relevance(0, other, 0.5));
        let row: f32 = fit.probabilities.as_ref().unwrap()[0].iter().sum();
        assert!((row - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_vectorizer_failure_propagates() {
        let model = ClusterTopicModel::new(Arc::new(KeywordEmbedder));
        let result = model.fit_transform(&corpus(), &params(50));
        assert!(matches!(result, Err(Error::Vectorizer(_))));
    }

    #[test]
    fn test_small_clusters_become_outliers() {
        let mut docs = Vec::new();
        for i in 0..8 {
            docs.push(format!("battery drains quickly after update number{}", i));
        }
        for i in 0..4 {
            docs.push(format!("camera photos look sharp outdoors shot{}", i));
        }

        let model = ClusterTopicModel::new(Arc::new(KeywordEmbedder));
        let fit = model.fit_transform(&docs, &params(1)).unwrap();

        assert_eq!(fit.topics.len(), 1);
        assert_eq!(fit.topics[0].size, 8);
        assert!(fit.assignments[..8].iter().all(|&t| t == 0));
        assert!(fit.assignments[8..].iter().all(|&t| t == OUTLIER_TOPIC));
        assert_eq!(fit.relevance(9, OUTLIER_TOPIC, 0.5), 0.5);
    }

    #[test]
    fn test_term_counts_join_bigrams_with_spaces() {
        let docs = vec![
            "battery drains overnight".to_string(),
            "battery drains fast".to_string(),
        ];
        let terms = count_terms(
            &docs,
            &VectorizerParams {
                ngram_range: (1, 2),
                ..Default::default()
            },
        )
        .unwrap();

        let column = terms
            .vocabulary
            .iter()
            .position(|t| t == "battery drains")
            .unwrap();
        assert_eq!(terms.counts.get(0, column), 1.0);
        assert_eq!(terms.counts.get(1, column), 1.0);
        assert!(terms.vocabulary.iter().all(|t| !t.contains('_')));
    }

    #[test]
    fn test_everything_pruned_is_an_error() {
        let docs = vec!["battery camera".to_string(), "screen speaker".to_string()];
        let result = count_terms(
            &docs,
            &VectorizerParams {
                min_df: 2,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Vectorizer(_))));
    }

    #[test]
    fn test_contradictory_bounds_are_an_error() {
        let docs = vec!["battery".to_string(); 4];
        let result = count_terms(
            &docs,
            &VectorizerParams {
                min_df: 3,
                max_df: 0.5,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Vectorizer(_))));
    }

    #[test]
    fn test_relevance_fallback_and_clamp() {
        let fit = TopicFit {
            assignments: vec![0],
            topics: Vec::new(),
            probabilities: None,
        };
        assert_eq!(fit.relevance(0, 0, 0.5), 0.5);
        assert_eq!(fit.relevance(0, 0, 1.7), 1.0);
        assert_eq!(fit.relevance(0, OUTLIER_TOPIC, 0.5), 0.5);
    }
}
