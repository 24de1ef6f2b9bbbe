//! Batch sentiment and topic passes over the stored reviews

use sentimentscope_analysis::{
    fit_with_retry, format_terms, make_topic_label, normalize, word_count, Attempt, FitOutcome,
    SentimentAdapter, Topic, TopicFit, TopicModel, TopicPlan, OUTLIER_TOPIC,
};
use sentimentscope_store::{ImportReport, Store, StoreTx, TopicCandidate};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::state::AppState;

const COMPLETED: &str = "completed";

/// Words used for a topic label
const LABEL_WORDS: usize = 3;

/// Terms stored as a topic's representative terms
const REPRESENTATIVE_TERMS: usize = 5;

/// Outcome of a sentiment pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentPassReport {
    pub status: &'static str,
    pub processed: usize,
    pub errors: usize,
    /// Reviews fetched, including skipped ones
    pub total_reviews: usize,
}

/// Result of the topic pass for one phone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneOutcome {
    /// Too few usable reviews
    Skipped,
    Modeled,
    /// Both fitting attempts failed
    Failed,
    /// Storage or runtime failure while handling the phone
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneTopicReport {
    pub phone_id: i64,
    pub phone_name: String,
    pub outcome: PhoneOutcome,
    pub topics_created: usize,
    pub clean_reviews: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<Attempt>,
    pub message: String,
}

/// Outcome of a topic pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicPassReport {
    pub status: &'static str,
    pub phones_processed: usize,
    pub results: Vec<PhoneTopicReport>,
}

/// Outcome of the sentiment pass followed by the topic pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessAllReport {
    pub status: &'static str,
    pub sentiment_result: SentimentPassReport,
    pub topic_result: TopicPassReport,
}

/// Classify every review lacking a sentiment, up to the configured batch
/// limit. Reviews too short to normalize are skipped without being counted;
/// a failure on one review is counted and the pass continues.
pub async fn run_sentiment_pass(state: &AppState) -> Result<SentimentPassReport, AppError> {
    let adapter = state.sentiment()?;
    let config = &state.config.pipeline;
    sentiment_pass(&state.store, adapter, config).await
}

async fn sentiment_pass(
    store: &Store,
    adapter: &SentimentAdapter,
    config: &PipelineConfig,
) -> Result<SentimentPassReport, AppError> {
    let reviews = store
        .pending_sentiment_reviews(config.sentiment_batch_limit)
        .await?;
    info!("Processing {} unprocessed reviews", reviews.len());

    let mut tx = store.begin().await?;
    let mut processed = 0;
    let mut errors = 0;

    for review in &reviews {
        if normalize(&review.review_text).is_empty() {
            debug!(review_id = review.review_id, "Skipping short review");
            continue;
        }

        let verdict = match adapter.analyze(review.review_text.trim()).await {
            Ok(verdict) => verdict,
            Err(e) => {
                errors += 1;
                metrics::counter!("sentimentscope_classification_errors_total").increment(1);
                error!(review_id = review.review_id, error = %e, "Error classifying review");
                continue;
            }
        };

        if let Err(e) = tx
            .upsert_sentiment(review.review_id, verdict.label, verdict.confidence)
            .await
        {
            errors += 1;
            error!(review_id = review.review_id, error = %e, "Error storing sentiment");
            continue;
        }

        processed += 1;
        metrics::counter!("sentimentscope_reviews_classified_total", "label" => verdict.label.as_str())
            .increment(1);

        if config.progress_interval > 0 && processed % config.progress_interval == 0 {
            info!("Processed {} reviews...", processed);
        }
    }

    tx.commit().await?;
    info!(processed, errors, "Sentiment pass complete");

    Ok(SentimentPassReport {
        status: COMPLETED,
        processed,
        errors,
        total_reviews: reviews.len(),
    })
}

/// Model topics for every phone with enough reviews. Each phone is handled
/// and committed on its own; a failing phone is reported and the pass moves
/// on.
pub async fn run_topic_pass(state: &AppState) -> Result<TopicPassReport, AppError> {
    let model = state.topic_model()?;
    topic_pass(&state.store, model, &state.config.pipeline).await
}

async fn topic_pass(
    store: &Store,
    model: Arc<dyn TopicModel>,
    config: &PipelineConfig,
) -> Result<TopicPassReport, AppError> {
    let phones = store.topic_candidates(config.min_reviews_per_phone).await?;
    info!("Processing topics for {} phones", phones.len());

    let mut results = Vec::with_capacity(phones.len());
    for phone in &phones {
        let report = match model_phone(store, Arc::clone(&model), config, phone).await {
            Ok(report) => report,
            Err(e) => {
                error!(phone_id = phone.phone_id, error = %e, "Topic pass failed for phone");
                PhoneTopicReport {
                    phone_id: phone.phone_id,
                    phone_name: phone.phone_name.clone(),
                    outcome: PhoneOutcome::Error,
                    topics_created: 0,
                    clean_reviews: 0,
                    attempt: None,
                    message: format!("{}: {}", phone.phone_name, e),
                }
            }
        };
        results.push(report);
    }

    Ok(TopicPassReport {
        status: COMPLETED,
        phones_processed: phones.len(),
        results,
    })
}

async fn model_phone(
    store: &Store,
    model: Arc<dyn TopicModel>,
    config: &PipelineConfig,
    phone: &TopicCandidate,
) -> Result<PhoneTopicReport, AppError> {
    let reviews = store.phone_reviews(phone.phone_id).await?;

    let mut docs = Vec::new();
    let mut review_ids = Vec::new();
    for review in reviews {
        let cleaned = normalize(&review.review_text);
        if !cleaned.is_empty() && word_count(&cleaned) >= config.min_words_per_review {
            docs.push(cleaned);
            review_ids.push(review.review_id);
        }
    }

    let mut report = PhoneTopicReport {
        phone_id: phone.phone_id,
        phone_name: phone.phone_name.clone(),
        outcome: PhoneOutcome::Skipped,
        topics_created: 0,
        clean_reviews: docs.len(),
        attempt: None,
        message: String::new(),
    };

    if docs.len() < config.min_clean_reviews {
        report.message = format!("Skipped {}: only {} clean reviews", phone.phone_name, docs.len());
        info!("{}", report.message);
        return Ok(report);
    }

    let plan = TopicPlan::for_corpus(docs.len());
    info!(
        phone = %phone.phone_name,
        docs = docs.len(),
        min_df = plan.primary.vectorizer.min_df,
        max_df = plan.primary.vectorizer.max_df,
        "Fitting topic model"
    );

    let outcome = tokio::task::spawn_blocking(move || fit_with_retry(model.as_ref(), &docs, &plan))
        .await
        .map_err(|e| AppError::Internal(format!("topic modeling task failed: {e}")))?;

    let (fit, attempt) = match outcome {
        FitOutcome::Fitted { fit, attempt } => (fit, attempt),
        FitOutcome::Failed { errors } => {
            for (attempt, message) in &errors {
                warn!(phone = %phone.phone_name, ?attempt, "{}", message);
            }
            metrics::counter!("sentimentscope_topic_fit_failures_total").increment(1);
            report.outcome = PhoneOutcome::Failed;
            report.message = format!("{}: Topic modeling failed completely", phone.phone_name);
            error!("{}", report.message);
            return Ok(report);
        }
    };

    let mut tx = store.begin().await?;
    let topics_created =
        store_topics(&mut tx, phone, &fit, &review_ids, config.fallback_relevance).await;
    tx.commit().await?;

    metrics::counter!("sentimentscope_topics_created_total").increment(topics_created as u64);
    report.outcome = PhoneOutcome::Modeled;
    report.topics_created = topics_created;
    report.attempt = Some(attempt);
    report.message = format!("{}: {} topics created", phone.phone_name, topics_created);
    info!("{}", report.message);
    Ok(report)
}

/// Persist the topics of one fit; returns how many were stored. A topic that
/// fails to store is logged and its partial writes are rolled back.
async fn store_topics(
    tx: &mut StoreTx<'_>,
    phone: &TopicCandidate,
    fit: &TopicFit,
    review_ids: &[i64],
    fallback_relevance: f32,
) -> usize {
    let mut created = 0;

    for topic in fit.topics.iter().filter(|t| t.id != OUTLIER_TOPIC) {
        if topic.words.len() < LABEL_WORDS {
            continue;
        }

        match store_topic(tx, phone.phone_id, topic, fit, review_ids, fallback_relevance).await {
            Ok(()) => created += 1,
            Err(e) => {
                error!(phone = %phone.phone_name, topic = topic.id, error = %e, "Error storing topic")
            }
        }
    }

    created
}

/// Write one topic and its review links under a savepoint
async fn store_topic(
    tx: &mut StoreTx<'_>,
    phone_id: i64,
    topic: &Topic,
    fit: &TopicFit,
    review_ids: &[i64],
    fallback_relevance: f32,
) -> Result<(), AppError> {
    let label_words: Vec<&str> = topic
        .words
        .iter()
        .take(LABEL_WORDS)
        .map(|(word, _)| word.as_str())
        .collect();
    let label = make_topic_label(&label_words);
    let terms = format_terms(&topic.words[..topic.words.len().min(REPRESENTATIVE_TERMS)]);

    let mut savepoint = tx.savepoint().await?;
    let topic_db_id = savepoint.upsert_topic(phone_id, &label, &terms).await?;
    for doc in fit.members(topic.id) {
        let Some(&review_id) = review_ids.get(doc) else {
            continue;
        };
        let relevance = fit.relevance(doc, topic.id, fallback_relevance);
        savepoint
            .link_review_topic(review_id, topic_db_id, relevance)
            .await?;
    }
    savepoint.commit().await?;
    Ok(())
}

/// Sentiment pass then topic pass. The two are not one transaction: a topic
/// failure keeps the stored sentiments.
pub async fn run_all(state: &AppState) -> Result<ProcessAllReport, AppError> {
    let sentiment_result = run_sentiment_pass(state).await?;
    let topic_result = run_topic_pass(state).await?;
    Ok(ProcessAllReport {
        status: COMPLETED,
        sentiment_result,
        topic_result,
    })
}

/// Import delimited review data and count the inserted reviews
pub async fn import_reviews<R: std::io::Read + Send>(
    store: &Store,
    reader: R,
    delimiter: u8,
) -> Result<ImportReport, AppError> {
    let report = store.import_csv(reader, delimiter).await?;
    metrics::counter!("sentimentscope_reviews_imported_total")
        .increment(report.reviews_inserted as u64);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentimentscope_store::DatabaseConfig;

    fn topic(id: i32, words: &[&str]) -> Topic {
        Topic {
            id,
            words: words.iter().map(|w| (w.to_string(), 0.2)).collect(),
            size: 1,
        }
    }

    #[tokio::test]
    async fn test_failed_topic_leaves_no_partial_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&DatabaseConfig {
            path: dir.path().join("reviews.db"),
            max_connections: 1,
        })
        .await
        .unwrap();
        store
            .import_csv(
                "brand_name,phone_name,review_text\n\
                 Acme,Rocket,the battery lasts all day long\n\
                 Acme,Rocket,speaker is loud for the price\n"
                    .as_bytes(),
                b',',
            )
            .await
            .unwrap();

        let phone = TopicCandidate {
            phone_id: 1,
            phone_name: "Rocket".to_string(),
            review_count: 2,
        };
        let fit = TopicFit {
            assignments: vec![0, 1, 1],
            topics: vec![
                topic(0, &["battery", "screen", "camera"]),
                topic(1, &["price", "speaker", "case"]),
            ],
            probabilities: None,
        };
        // the last document maps to a review that does not exist
        let review_ids = [1, 2, 999];

        let mut tx = store.begin().await.unwrap();
        let created = store_topics(&mut tx, &phone, &fit, &review_ids, 0.5).await;
        tx.commit().await.unwrap();

        assert_eq!(created, 1);
        let topics = store.topic_summaries(Some(1)).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].topic_label, "Battery, Screen, and Camera");
        assert_eq!(topics[0].review_mentions, 1);
    }
}
