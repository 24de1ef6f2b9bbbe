//! Database handle, connection setup and write operations

use sentimentscope_core::SentimentLabel;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Connection, Sqlite, Transaction};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::models::ClearReport;
use crate::schema::SCHEMA_SQL;

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, created when missing
    #[serde(default = "default_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_path() -> PathBuf {
    PathBuf::from("sentimentscope.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Review database handle
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to the database and make sure the schema exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", config.path);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write transaction; it rolls back if dropped without commit
    pub async fn begin(&self) -> Result<StoreTx<'static>> {
        Ok(StoreTx {
            tx: self.pool.begin().await?,
        })
    }

    /// Insert or overwrite the sentiment of one review
    pub async fn upsert_sentiment(
        &self,
        review_id: i64,
        label: SentimentLabel,
        score: f32,
    ) -> Result<()> {
        let mut tx = self.begin().await?;
        tx.upsert_sentiment(review_id, label, score).await?;
        tx.commit().await
    }

    /// Delete all derived data (review-topic links, topics, sentiments)
    pub async fn clear_derived(&self) -> Result<ClearReport> {
        let mut tx = self.pool.begin().await?;

        let review_topics = sqlx::query("DELETE FROM review_topics")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let topics = sqlx::query("DELETE FROM topics")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let sentiments = sqlx::query("DELETE FROM sentiments")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        info!(review_topics, topics, sentiments, "Cleared derived data");
        Ok(ClearReport {
            review_topics,
            topics,
            sentiments,
        })
    }
}

/// An open write transaction, or a savepoint nested in one
pub struct StoreTx<'c> {
    tx: Transaction<'c, Sqlite>,
}

impl StoreTx<'_> {
    /// Open a savepoint. Dropping it without commit undoes only the writes
    /// made through it; the enclosing transaction stays usable.
    pub async fn savepoint(&mut self) -> Result<StoreTx<'_>> {
        Ok(StoreTx {
            tx: Connection::begin(&mut *self.tx).await?,
        })
    }

    /// Id of the brand called `name`, inserting it if needed
    pub async fn get_or_create_brand(&mut self, name: &str) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO brands (brand_name) VALUES (?)
            ON CONFLICT(brand_name) DO UPDATE SET brand_name = excluded.brand_name
            RETURNING brand_id
            "#,
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    /// Id of the phone `name` of `brand_id`, inserting it if needed
    pub async fn get_or_create_phone(&mut self, brand_id: i64, name: &str) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO phones (brand_id, phone_name) VALUES (?, ?)
            ON CONFLICT(brand_id, phone_name) DO UPDATE SET phone_name = excluded.phone_name
            RETURNING phone_id
            "#,
        )
        .bind(brand_id)
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    pub async fn insert_review(&mut self, phone_id: i64, text: &str) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO reviews (phone_id, review_text) VALUES (?, ?) RETURNING review_id",
        )
        .bind(phone_id)
        .bind(text)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    /// Insert or overwrite the sentiment of `review_id`
    pub async fn upsert_sentiment(
        &mut self,
        review_id: i64,
        label: SentimentLabel,
        score: f32,
    ) -> Result<()> {
        if !(0.0..=1.0).contains(&score) {
            return Err(StoreError::InvalidValue(format!(
                "sentiment score {score} outside [0, 1]"
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO sentiments (review_id, sentiment_label, sentiment_score)
            VALUES (?, ?, ?)
            ON CONFLICT(review_id) DO UPDATE SET
                sentiment_label = excluded.sentiment_label,
                sentiment_score = excluded.sentiment_score
            "#,
        )
        .bind(review_id)
        .bind(label.as_str())
        .bind(f64::from(score))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Insert the (phone, label) topic or refresh its terms; returns its id
    pub async fn upsert_topic(
        &mut self,
        phone_id: i64,
        label: &str,
        representative_terms: &str,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO topics (phone_id, topic_label, representative_terms)
            VALUES (?, ?, ?)
            ON CONFLICT(phone_id, topic_label) DO UPDATE SET
                representative_terms = excluded.representative_terms
            RETURNING topic_id
            "#,
        )
        .bind(phone_id)
        .bind(label)
        .bind(representative_terms)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    /// Associate a review with a topic; relevance is clamped to [0, 1]
    pub async fn link_review_topic(
        &mut self,
        review_id: i64,
        topic_id: i64,
        relevance: f32,
    ) -> Result<()> {
        let relevance = if relevance.is_finite() {
            relevance.clamp(0.0, 1.0)
        } else {
            0.0
        };

        sqlx::query(
            r#"
            INSERT INTO review_topics (review_id, topic_id, relevance_score)
            VALUES (?, ?, ?)
            ON CONFLICT(review_id, topic_id) DO UPDATE SET
                relevance_score = excluded.relevance_score
            "#,
        )
        .bind(review_id)
        .bind(topic_id)
        .bind(f64::from(relevance))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
