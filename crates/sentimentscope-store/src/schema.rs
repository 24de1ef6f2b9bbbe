//! SQLite schema definition

/// SQL schema for the review database
pub const SCHEMA_SQL: &str = r#"
-- Brands: unique, case-sensitive names
CREATE TABLE IF NOT EXISTS brands (
    brand_id INTEGER PRIMARY KEY AUTOINCREMENT,
    brand_name TEXT NOT NULL UNIQUE
);

-- Phones: unique per brand
CREATE TABLE IF NOT EXISTS phones (
    phone_id INTEGER PRIMARY KEY AUTOINCREMENT,
    brand_id INTEGER NOT NULL REFERENCES brands(brand_id),
    phone_name TEXT NOT NULL,
    UNIQUE(brand_id, phone_name)
);

-- Reviews: raw text, duplicates allowed
CREATE TABLE IF NOT EXISTS reviews (
    review_id INTEGER PRIMARY KEY AUTOINCREMENT,
    phone_id INTEGER NOT NULL REFERENCES phones(phone_id),
    review_text TEXT NOT NULL
);

-- Sentiments: at most one per review
CREATE TABLE IF NOT EXISTS sentiments (
    sentiment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    review_id INTEGER NOT NULL UNIQUE REFERENCES reviews(review_id),
    sentiment_label TEXT NOT NULL
        CHECK (sentiment_label IN ('positive', 'neutral', 'negative')),
    sentiment_score REAL NOT NULL
        CHECK (sentiment_score >= 0.0 AND sentiment_score <= 1.0)
);

-- Topics: one row per (phone, label)
CREATE TABLE IF NOT EXISTS topics (
    topic_id INTEGER PRIMARY KEY AUTOINCREMENT,
    phone_id INTEGER NOT NULL REFERENCES phones(phone_id),
    topic_label TEXT NOT NULL,
    representative_terms TEXT,
    UNIQUE(phone_id, topic_label)
);

-- Review/topic association
CREATE TABLE IF NOT EXISTS review_topics (
    review_id INTEGER NOT NULL REFERENCES reviews(review_id),
    topic_id INTEGER NOT NULL REFERENCES topics(topic_id),
    relevance_score REAL NOT NULL
        CHECK (relevance_score >= 0.0 AND relevance_score <= 1.0),
    PRIMARY KEY (review_id, topic_id)
);

CREATE INDEX IF NOT EXISTS idx_phones_brand ON phones(brand_id);
CREATE INDEX IF NOT EXISTS idx_reviews_phone ON reviews(phone_id);
CREATE INDEX IF NOT EXISTS idx_topics_phone ON topics(phone_id);
CREATE INDEX IF NOT EXISTS idx_review_topics_topic ON review_topics(topic_id);
"#;
