//! Row types returned by the store

use sentimentscope_core::{rating, SentimentLabel};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Brand {
    pub brand_id: i64,
    pub brand_name: String,
}

/// Phone with its review and sentiment aggregates
#[derive(Debug, Clone, Serialize)]
pub struct PhoneSummary {
    pub phone_id: i64,
    pub phone_name: String,
    pub brand_id: i64,
    pub brand_name: String,
    pub review_count: i64,
    pub processed_sentiments: i64,
    /// Mean of positive=5, neutral=3, negative=1; 3.0 without sentiments
    pub avg_sentiment_rating: f64,
    pub star_rating: f64,
    /// Topic labels joined by ", "
    pub topics: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct PhoneSummaryRow {
    pub phone_id: i64,
    pub phone_name: String,
    pub brand_id: i64,
    pub brand_name: String,
    pub review_count: i64,
    pub processed_sentiments: i64,
    pub positive_sentiments: i64,
    pub avg_sentiment_rating: Option<f64>,
    pub topics: Option<String>,
}

impl From<PhoneSummaryRow> for PhoneSummary {
    fn from(row: PhoneSummaryRow) -> Self {
        let star_rating = rating::star_rating(
            row.positive_sentiments.max(0) as u64,
            row.processed_sentiments.max(0) as u64,
        );
        Self {
            phone_id: row.phone_id,
            phone_name: row.phone_name,
            brand_id: row.brand_id,
            brand_name: row.brand_name,
            review_count: row.review_count,
            processed_sentiments: row.processed_sentiments,
            avg_sentiment_rating: row
                .avg_sentiment_rating
                .map(|avg| (avg * 100.0).round() / 100.0)
                .unwrap_or(rating::NEUTRAL_STAR_RATING),
            star_rating,
            topics: row.topics,
        }
    }
}

/// Filters for listing phones
#[derive(Debug, Clone, Default)]
pub struct PhoneFilter {
    pub brand_id: Option<i64>,
    /// Substring of the phone name
    pub search: Option<String>,
    pub limit: Option<u32>,
}

/// Filters for the free-text phone search
#[derive(Debug, Clone, Default)]
pub struct PhoneSearch {
    /// Substring of the phone name or of any review text
    pub query: String,
    pub sentiment: Option<SentimentLabel>,
    pub brand_id: Option<i64>,
    /// Minimum number of matching reviews
    pub min_reviews: Option<u32>,
    pub limit: Option<u32>,
}

/// A review with phone/brand names and, optionally, its sentiment
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewRecord {
    pub review_id: i64,
    pub phone_id: i64,
    pub review_text: String,
    pub phone_name: String,
    pub brand_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
}

/// A review queued for analysis
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PendingReview {
    pub review_id: i64,
    pub phone_id: i64,
    pub review_text: String,
}

/// A phone eligible for topic modeling
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TopicCandidate {
    pub phone_id: i64,
    pub phone_name: String,
    pub review_count: i64,
}

/// Per-label sentiment aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentBucket {
    pub count: i64,
    /// Mean confidence, 3 decimals
    pub confidence: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Share of processed reviews, 1 decimal
    pub percentage: f64,
}

#[derive(Debug, FromRow)]
pub(crate) struct SentimentBucketRow {
    pub sentiment_label: String,
    pub count: i64,
    pub avg_score: f64,
    pub min_score: f64,
    pub max_score: f64,
}

/// Sentiment distribution for one phone (or all phones)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub phone_id: Option<i64>,
    /// Number of reviews with a sentiment
    pub total_reviews: i64,
    pub sentiments: BTreeMap<String, SentimentBucket>,
}

impl SentimentSummary {
    pub(crate) fn from_rows(phone_id: Option<i64>, rows: Vec<SentimentBucketRow>) -> Self {
        let total: i64 = rows.iter().map(|r| r.count).sum();
        let sentiments = rows
            .into_iter()
            .map(|row| {
                let bucket = SentimentBucket {
                    count: row.count,
                    confidence: (row.avg_score * 1000.0).round() / 1000.0,
                    min_score: row.min_score,
                    max_score: row.max_score,
                    percentage: rating::percentage(row.count.max(0) as u64, total.max(0) as u64),
                };
                (row.sentiment_label, bucket)
            })
            .collect();

        Self {
            phone_id,
            total_reviews: total,
            sentiments,
        }
    }

    /// Number of processed reviews labeled positive
    pub fn positive_count(&self) -> i64 {
        self.sentiments
            .get(SentimentLabel::Positive.as_str())
            .map_or(0, |b| b.count)
    }

    /// Star rating for this distribution, from the raw counts
    pub fn star_rating(&self) -> f64 {
        rating::star_rating(
            self.positive_count().max(0) as u64,
            self.total_reviews.max(0) as u64,
        )
    }
}

/// A topic with its association statistics
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TopicSummary {
    pub topic_id: i64,
    pub phone_id: i64,
    pub topic_label: String,
    pub representative_terms: Option<String>,
    pub review_mentions: i64,
    pub avg_relevance: Option<f64>,
}

/// A phone row with brand name
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PhoneDetail {
    pub phone_id: i64,
    pub phone_name: String,
    pub brand_id: i64,
    pub brand_name: String,
}

/// Everything the dashboard shows for one phone
#[derive(Debug, Clone, Serialize)]
pub struct CompletePhoneView {
    pub phone: PhoneDetail,
    pub star_rating: f64,
    pub sentiments: SentimentSummary,
    pub reviews: Vec<ReviewRecord>,
    pub topics: Vec<TopicSummary>,
}

/// Row counts across the database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseStats {
    pub brands: i64,
    pub phones: i64,
    pub reviews: i64,
    pub processed_sentiments: i64,
    pub topics: i64,
}

/// Progress of the analysis passes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStatus {
    pub total_reviews: i64,
    pub processed_sentiments: i64,
    pub unprocessed_reviews: i64,
    pub total_topics: i64,
    pub topic_assignments: i64,
    /// Processed share of all reviews, 1 decimal; 0 without reviews
    pub sentiment_percentage: f64,
}

/// Rows removed by a bulk clear
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearReport {
    pub review_topics: u64,
    pub topics: u64,
    pub sentiments: u64,
}
