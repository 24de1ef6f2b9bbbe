//! Read-only aggregation queries

use sentimentscope_core::rating;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::Store;
use crate::error::{Result, StoreError};
use crate::models::{
    Brand, CompletePhoneView, DatabaseStats, PendingReview, PhoneDetail, PhoneFilter, PhoneSearch,
    PhoneSummary, PhoneSummaryRow, ProcessingStatus, ReviewRecord, SentimentBucketRow,
    SentimentSummary, TopicCandidate, TopicSummary,
};

/// Reviews returned with the complete phone view
pub const COMPLETE_VIEW_REVIEW_LIMIT: u32 = 50;

const PHONE_SUMMARY_SELECT: &str = r#"
SELECT
    p.phone_id,
    p.phone_name,
    p.brand_id,
    b.brand_name,
    COUNT(DISTINCT r.review_id) AS review_count,
    COUNT(DISTINCT s.sentiment_id) AS processed_sentiments,
    COUNT(DISTINCT CASE WHEN s.sentiment_label = 'positive' THEN s.sentiment_id END)
        AS positive_sentiments,
    AVG(CASE s.sentiment_label
        WHEN 'positive' THEN 5.0
        WHEN 'neutral' THEN 3.0
        WHEN 'negative' THEN 1.0
    END) AS avg_sentiment_rating,
    (SELECT GROUP_CONCAT(t.topic_label, ', ') FROM topics t WHERE t.phone_id = p.phone_id)
        AS topics
FROM phones p
JOIN brands b ON b.brand_id = p.brand_id
LEFT JOIN reviews r ON r.phone_id = p.phone_id
LEFT JOIN sentiments s ON s.review_id = r.review_id
WHERE 1 = 1"#;

/// SQLite treats a negative LIMIT as "no limit"
fn sql_limit(limit: Option<u32>) -> i64 {
    limit.map_or(-1, i64::from)
}

impl Store {
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let (brands, phones, reviews, processed_sentiments, topics) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM brands),
                    (SELECT COUNT(*) FROM phones),
                    (SELECT COUNT(*) FROM reviews),
                    (SELECT COUNT(*) FROM sentiments),
                    (SELECT COUNT(*) FROM topics)
                "#,
            )
            .fetch_one(self.pool())
            .await?;

        Ok(DatabaseStats {
            brands,
            phones,
            reviews,
            processed_sentiments,
            topics,
        })
    }

    pub async fn processing_status(&self) -> Result<ProcessingStatus> {
        let (total_reviews, processed_sentiments, total_topics, topic_assignments) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM reviews),
                    (SELECT COUNT(*) FROM sentiments),
                    (SELECT COUNT(*) FROM topics),
                    (SELECT COUNT(*) FROM review_topics)
                "#,
            )
            .fetch_one(self.pool())
            .await?;

        Ok(ProcessingStatus {
            total_reviews,
            processed_sentiments,
            unprocessed_reviews: (total_reviews - processed_sentiments).max(0),
            total_topics,
            topic_assignments,
            sentiment_percentage: rating::percentage(
                processed_sentiments.max(0) as u64,
                total_reviews.max(0) as u64,
            ),
        })
    }

    pub async fn list_brands(&self) -> Result<Vec<Brand>> {
        let brands = sqlx::query_as::<_, Brand>(
            "SELECT brand_id, brand_name FROM brands ORDER BY brand_name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(brands)
    }

    pub async fn get_phone(&self, phone_id: i64) -> Result<Option<PhoneDetail>> {
        let phone = sqlx::query_as::<_, PhoneDetail>(
            r#"
            SELECT p.phone_id, p.phone_name, p.brand_id, b.brand_name
            FROM phones p
            JOIN brands b ON b.brand_id = p.brand_id
            WHERE p.phone_id = ?
            "#,
        )
        .bind(phone_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(phone)
    }

    /// Fails with [`StoreError::NotFound`] for an unknown phone
    pub async fn require_phone(&self, phone_id: i64) -> Result<PhoneDetail> {
        self.get_phone(phone_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("phone {phone_id}")))
    }

    /// Phones with aggregates, most reviewed first
    pub async fn list_phones(&self, filter: &PhoneFilter) -> Result<Vec<PhoneSummary>> {
        let mut qb = QueryBuilder::<Sqlite>::new(PHONE_SUMMARY_SELECT);
        if let Some(brand_id) = filter.brand_id {
            qb.push(" AND p.brand_id = ").push_bind(brand_id);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND p.phone_name LIKE ").push_bind(format!("%{search}%"));
        }
        qb.push(" GROUP BY p.phone_id ORDER BY review_count DESC, p.phone_name LIMIT ")
            .push_bind(sql_limit(filter.limit));

        let rows = qb
            .build_query_as::<PhoneSummaryRow>()
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(PhoneSummary::from).collect())
    }

    /// Phones whose name or review text contains the query
    pub async fn search_phones(&self, search: &PhoneSearch) -> Result<Vec<PhoneSummary>> {
        let pattern = format!("%{}%", search.query);
        let mut qb = QueryBuilder::<Sqlite>::new(PHONE_SUMMARY_SELECT);
        qb.push(" AND (p.phone_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.review_text LIKE ")
            .push_bind(pattern)
            .push(")");
        if let Some(label) = search.sentiment {
            qb.push(" AND s.sentiment_label = ").push_bind(label.as_str());
        }
        if let Some(brand_id) = search.brand_id {
            qb.push(" AND p.brand_id = ").push_bind(brand_id);
        }
        qb.push(" GROUP BY p.phone_id");
        if let Some(min_reviews) = search.min_reviews {
            qb.push(" HAVING COUNT(DISTINCT r.review_id) >= ")
                .push_bind(i64::from(min_reviews));
        }
        qb.push(" ORDER BY review_count DESC, processed_sentiments DESC, p.phone_name LIMIT ")
            .push_bind(sql_limit(search.limit));

        let rows = qb
            .build_query_as::<PhoneSummaryRow>()
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(PhoneSummary::from).collect())
    }

    /// Reviews, most confident sentiment first, unscored last
    pub async fn list_reviews(
        &self,
        phone_id: Option<i64>,
        limit: Option<u32>,
        with_sentiment: bool,
    ) -> Result<Vec<ReviewRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(if with_sentiment {
            "SELECT r.review_id, r.phone_id, r.review_text, p.phone_name, b.brand_name, \
             s.sentiment_label, s.sentiment_score"
        } else {
            "SELECT r.review_id, r.phone_id, r.review_text, p.phone_name, b.brand_name, \
             NULL AS sentiment_label, NULL AS sentiment_score"
        });
        qb.push(
            " FROM reviews r \
             JOIN phones p ON p.phone_id = r.phone_id \
             JOIN brands b ON b.brand_id = p.brand_id \
             LEFT JOIN sentiments s ON s.review_id = r.review_id \
             WHERE 1 = 1",
        );
        if let Some(phone_id) = phone_id {
            qb.push(" AND r.phone_id = ").push_bind(phone_id);
        }
        qb.push(" ORDER BY COALESCE(s.sentiment_score, 0) DESC, r.review_id DESC LIMIT ")
            .push_bind(sql_limit(limit));

        let reviews = qb
            .build_query_as::<ReviewRecord>()
            .fetch_all(self.pool())
            .await?;
        Ok(reviews)
    }

    /// Reviews without a sentiment, oldest first
    pub async fn unprocessed_reviews(&self, limit: Option<u32>) -> Result<Vec<ReviewRecord>> {
        let reviews = sqlx::query_as::<_, ReviewRecord>(
            r#"
            SELECT r.review_id, r.phone_id, r.review_text, p.phone_name, b.brand_name,
                   NULL AS sentiment_label, NULL AS sentiment_score
            FROM reviews r
            JOIN phones p ON p.phone_id = r.phone_id
            JOIN brands b ON b.brand_id = p.brand_id
            LEFT JOIN sentiments s ON s.review_id = r.review_id
            WHERE s.review_id IS NULL
            ORDER BY r.review_id
            LIMIT ?
            "#,
        )
        .bind(sql_limit(limit))
        .fetch_all(self.pool())
        .await?;
        Ok(reviews)
    }

    /// Sentiment distribution for a phone, or for every phone
    pub async fn sentiment_summary(&self, phone_id: Option<i64>) -> Result<SentimentSummary> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT s.sentiment_label, COUNT(*) AS count, AVG(s.sentiment_score) AS avg_score, \
             MIN(s.sentiment_score) AS min_score, MAX(s.sentiment_score) AS max_score \
             FROM sentiments s JOIN reviews r ON r.review_id = s.review_id WHERE 1 = 1",
        );
        if let Some(phone_id) = phone_id {
            qb.push(" AND r.phone_id = ").push_bind(phone_id);
        }
        qb.push(" GROUP BY s.sentiment_label ORDER BY s.sentiment_label");

        let rows = qb
            .build_query_as::<SentimentBucketRow>()
            .fetch_all(self.pool())
            .await?;
        Ok(SentimentSummary::from_rows(phone_id, rows))
    }

    /// Topics with mention counts, most relevant first
    pub async fn topic_summaries(&self, phone_id: Option<i64>) -> Result<Vec<TopicSummary>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT t.topic_id, t.phone_id, t.topic_label, t.representative_terms, \
             COUNT(rt.review_id) AS review_mentions, AVG(rt.relevance_score) AS avg_relevance \
             FROM topics t LEFT JOIN review_topics rt ON rt.topic_id = t.topic_id WHERE 1 = 1",
        );
        if let Some(phone_id) = phone_id {
            qb.push(" AND t.phone_id = ").push_bind(phone_id);
        }
        qb.push(" GROUP BY t.topic_id ORDER BY avg_relevance DESC, review_mentions DESC");

        let topics = qb
            .build_query_as::<TopicSummary>()
            .fetch_all(self.pool())
            .await?;
        Ok(topics)
    }

    /// Phone, sentiment distribution, latest reviews and topics in one view.
    ///
    /// Returns `None` for an unknown phone. Failing sub-queries degrade to
    /// empty sections.
    pub async fn complete_view(&self, phone_id: i64) -> Result<Option<CompletePhoneView>> {
        let Some(phone) = self.get_phone(phone_id).await? else {
            return Ok(None);
        };

        let sentiments = self
            .sentiment_summary(Some(phone_id))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(phone_id, error = %e, "Sentiment summary failed");
                SentimentSummary::from_rows(Some(phone_id), Vec::new())
            });

        let reviews = self
            .list_reviews(Some(phone_id), Some(COMPLETE_VIEW_REVIEW_LIMIT), true)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(phone_id, error = %e, "Review listing failed");
                Vec::new()
            });

        let topics = self
            .topic_summaries(Some(phone_id))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(phone_id, error = %e, "Topic listing failed");
                Vec::new()
            });

        Ok(Some(CompletePhoneView {
            star_rating: sentiments.star_rating(),
            phone,
            sentiments,
            reviews,
            topics,
        }))
    }

    // ===== Pipeline inputs =====

    /// Reviews lacking a sentiment, lowest id first
    pub async fn pending_sentiment_reviews(&self, limit: u32) -> Result<Vec<PendingReview>> {
        let reviews = sqlx::query_as::<_, PendingReview>(
            r#"
            SELECT r.review_id, r.phone_id, r.review_text
            FROM reviews r
            LEFT JOIN sentiments s ON s.review_id = r.review_id
            WHERE s.review_id IS NULL
            ORDER BY r.review_id
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;
        Ok(reviews)
    }

    /// Phones with at least `min_reviews` reviews, most reviewed first
    pub async fn topic_candidates(&self, min_reviews: u32) -> Result<Vec<TopicCandidate>> {
        let phones = sqlx::query_as::<_, TopicCandidate>(
            r#"
            SELECT p.phone_id, p.phone_name, COUNT(r.review_id) AS review_count
            FROM phones p
            JOIN reviews r ON r.phone_id = p.phone_id
            GROUP BY p.phone_id
            HAVING COUNT(r.review_id) >= ?
            ORDER BY review_count DESC, p.phone_id
            "#,
        )
        .bind(i64::from(min_reviews))
        .fetch_all(self.pool())
        .await?;
        Ok(phones)
    }

    /// All reviews of one phone, lowest id first
    pub async fn phone_reviews(&self, phone_id: i64) -> Result<Vec<PendingReview>> {
        let reviews = sqlx::query_as::<_, PendingReview>(
            "SELECT review_id, phone_id, review_text FROM reviews WHERE phone_id = ? ORDER BY review_id",
        )
        .bind(phone_id)
        .fetch_all(self.pool())
        .await?;
        Ok(reviews)
    }
}
