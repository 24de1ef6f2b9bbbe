//! Store integration tests against an on-disk SQLite database

use sentimentscope_core::SentimentLabel;
use sentimentscope_store::{
    DatabaseConfig, PhoneFilter, PhoneSearch, Store, StoreError,
};
use tempfile::TempDir;

async fn open_store() -> (Store, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("reviews.db"),
        max_connections: 2,
    };
    let store = Store::connect(&config).await.unwrap();
    (store, dir)
}

const SAMPLE_CSV: &str = "\
brand_name,phone_name,review_text
Acme,Rocket 5,I love this phone the battery lasts all day
Acme,Rocket 5,Screen cracked after one week of light use
Acme,Rocket 5,Camera is fine but nothing special honestly
Globex,Orbit,Decent value for the price and fast charging
";

#[tokio::test]
async fn test_import_skips_rows_with_empty_fields() {
    let (store, _dir) = open_store().await;
    let csv = "brand_name,phone_name,review_text\n\
               BrandA,PhoneX,This phone is great and fast\n\
               BrandA,PhoneX,\n";

    let report = store.import_csv(csv.as_bytes(), b',').await.unwrap();

    assert_eq!(report.rows_read, 2);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.reviews_inserted, 1);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.brands, 1);
    assert_eq!(stats.phones, 1);
    assert_eq!(stats.reviews, 1);
}

#[tokio::test]
async fn test_import_trims_and_handles_short_rows() {
    let (store, _dir) = open_store().await;
    let csv = "brand_name;phone_name;review_text;rating\n  Acme ; Rocket 5 ;  Great phone overall  ;5\nAcme;Rocket 5\n";

    let report = store.import_csv(csv.as_bytes(), b';').await.unwrap();
    assert_eq!(report.reviews_inserted, 1);
    assert_eq!(report.rows_skipped, 1);

    let brands = store.list_brands().await.unwrap();
    assert_eq!(brands[0].brand_name, "Acme");
    let reviews = store.list_reviews(None, None, false).await.unwrap();
    assert_eq!(reviews[0].review_text, "Great phone overall");
    assert_eq!(reviews[0].phone_name, "Rocket 5");
}

#[tokio::test]
async fn test_reimport_does_not_duplicate_brands_or_phones() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.brands, 2);
    assert_eq!(stats.phones, 2);
    assert_eq!(stats.reviews, 8);
}

#[tokio::test]
async fn test_brand_names_are_case_sensitive() {
    let (store, _dir) = open_store().await;
    let csv = "brand_name,phone_name,review_text\nAcme,One,first review text\nacme,One,second review text\n";
    let report = store.import_csv(csv.as_bytes(), b',').await.unwrap();
    assert_eq!(report.brands, 2);
    assert_eq!(store.list_brands().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_column_is_reported() {
    let (store, _dir) = open_store().await;
    let err = store
        .import_csv("brand,phone,text\na,b,c\n".as_bytes(), b',')
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingColumn(col) if col == "brand_name"));
}

#[tokio::test]
async fn test_get_or_create_is_stable() {
    let (store, _dir) = open_store().await;
    let mut tx = store.begin().await.unwrap();
    let a = tx.get_or_create_brand("Acme").await.unwrap();
    let b = tx.get_or_create_brand("Acme").await.unwrap();
    let p1 = tx.get_or_create_phone(a, "Rocket").await.unwrap();
    let p2 = tx.get_or_create_phone(b, "Rocket").await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(a, b);
    assert_eq!(p1, p2);
}

#[tokio::test]
async fn test_sentiment_upsert_overwrites() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();

    store.upsert_sentiment(1, SentimentLabel::Negative, 0.8).await.unwrap();
    store.upsert_sentiment(1, SentimentLabel::Positive, 0.95).await.unwrap();

    let summary = store.sentiment_summary(None).await.unwrap();
    assert_eq!(summary.total_reviews, 1);
    assert_eq!(summary.sentiments["positive"].count, 1);
    assert!(!summary.sentiments.contains_key("negative"));

    let err = store.upsert_sentiment(2, SentimentLabel::Positive, 1.5).await;
    assert!(matches!(err, Err(StoreError::InvalidValue(_))));
}

#[tokio::test]
async fn test_pending_reviews_shrink_as_sentiments_land() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();

    let pending = store.pending_sentiment_reviews(10).await.unwrap();
    assert_eq!(pending.len(), 4);
    assert_eq!(pending[0].review_id, 1);

    store.upsert_sentiment(1, SentimentLabel::Positive, 0.9).await.unwrap();
    let pending = store.pending_sentiment_reviews(2).await.unwrap();
    assert_eq!(
        pending.iter().map(|r| r.review_id).collect::<Vec<_>>(),
        vec![2, 3]
    );

    let status = store.processing_status().await.unwrap();
    assert_eq!(status.total_reviews, 4);
    assert_eq!(status.processed_sentiments, 1);
    assert_eq!(status.unprocessed_reviews, 3);
    assert_eq!(status.sentiment_percentage, 25.0);

    let unprocessed = store.unprocessed_reviews(Some(100)).await.unwrap();
    assert_eq!(unprocessed.len(), 3);
    assert_eq!(unprocessed[0].brand_name, "Acme");
}

#[tokio::test]
async fn test_phone_listing_aggregates() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();

    store.upsert_sentiment(1, SentimentLabel::Positive, 0.99).await.unwrap();
    store.upsert_sentiment(2, SentimentLabel::Negative, 0.91).await.unwrap();
    store.upsert_sentiment(3, SentimentLabel::Neutral, 0.6).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let topic = tx.upsert_topic(1, "Battery and Screen", "battery(0.31), screen(0.22)").await.unwrap();
    tx.link_review_topic(1, topic, 0.8).await.unwrap();
    tx.upsert_topic(1, "Camera", "camera(0.40)").await.unwrap();
    tx.commit().await.unwrap();

    let phones = store.list_phones(&PhoneFilter::default()).await.unwrap();
    assert_eq!(phones.len(), 2);

    let rocket = &phones[0];
    assert_eq!(rocket.phone_name, "Rocket 5");
    assert_eq!(rocket.review_count, 3);
    assert_eq!(rocket.processed_sentiments, 3);
    assert_eq!(rocket.avg_sentiment_rating, 3.0);
    // 1 of 3 positive = 33.3% -> 2 stars
    assert_eq!(rocket.star_rating, 2.0);
    let topics = rocket.topics.as_deref().unwrap();
    assert!(topics.contains("Battery and Screen"));
    assert!(topics.contains("Camera"));

    let orbit = &phones[1];
    assert_eq!(orbit.processed_sentiments, 0);
    assert_eq!(orbit.star_rating, 3.0);
    assert_eq!(orbit.avg_sentiment_rating, 3.0);
    assert!(orbit.topics.is_none());

    let filtered = store
        .list_phones(&PhoneFilter {
            search: Some("Orb".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].brand_name, "Globex");
}

#[tokio::test]
async fn test_reviews_ordered_by_confidence() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();
    store.upsert_sentiment(2, SentimentLabel::Negative, 0.91).await.unwrap();
    store.upsert_sentiment(1, SentimentLabel::Positive, 0.99).await.unwrap();

    let reviews = store.list_reviews(Some(1), Some(100), true).await.unwrap();
    let ids: Vec<i64> = reviews.iter().map(|r| r.review_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(reviews[0].sentiment_label.as_deref(), Some("positive"));
    assert!(reviews[2].sentiment_score.is_none());

    let bare = store.list_reviews(Some(1), Some(1), false).await.unwrap();
    assert_eq!(bare.len(), 1);
    assert!(bare[0].sentiment_label.is_none());
}

#[tokio::test]
async fn test_topic_links_are_idempotent_and_clamped() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();

    for relevance in [0.4, 1.7] {
        let mut tx = store.begin().await.unwrap();
        let topic = tx.upsert_topic(1, "Battery", "battery(0.50)").await.unwrap();
        tx.link_review_topic(1, topic, relevance).await.unwrap();
        tx.link_review_topic(2, topic, 0.2).await.unwrap();
        tx.commit().await.unwrap();
    }

    let topics = store.topic_summaries(Some(1)).await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].review_mentions, 2);
    // (1.0 + 0.2) / 2
    assert!((topics[0].avg_relevance.unwrap() - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn test_complete_view() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();
    for id in 1..=3 {
        store.upsert_sentiment(id, SentimentLabel::Positive, 0.9).await.unwrap();
    }

    assert!(store.complete_view(999).await.unwrap().is_none());

    let view = store.complete_view(1).await.unwrap().unwrap();
    assert_eq!(view.phone.phone_name, "Rocket 5");
    assert_eq!(view.phone.brand_name, "Acme");
    assert_eq!(view.reviews.len(), 3);
    assert_eq!(view.sentiments.sentiments["positive"].percentage, 100.0);
    assert_eq!(view.star_rating, 5.0);
    assert!(view.topics.is_empty());
}

#[tokio::test]
async fn test_star_rating_uses_unrounded_share() {
    let (store, _dir) = open_store().await;

    // 1999 of 2500 positive is 79.96%, shown as 80.0 but still 4 stars
    let mut tx = store.begin().await.unwrap();
    let brand = tx.get_or_create_brand("Acme").await.unwrap();
    let phone = tx.get_or_create_phone(brand, "Borderline").await.unwrap();
    for i in 0..2500 {
        let review = tx.insert_review(phone, "a perfectly ordinary review").await.unwrap();
        let label = if i < 1999 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        };
        tx.upsert_sentiment(review, label, 0.9).await.unwrap();
    }
    tx.commit().await.unwrap();

    let view = store.complete_view(phone).await.unwrap().unwrap();
    assert_eq!(view.sentiments.sentiments["positive"].percentage, 80.0);
    assert_eq!(view.star_rating, 4.0);

    let phones = store.list_phones(&PhoneFilter::default()).await.unwrap();
    assert_eq!(phones[0].star_rating, 4.0);
}

#[tokio::test]
async fn test_savepoint_rolls_back_only_its_writes() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.upsert_topic(1, "Battery", "battery(0.40)").await.unwrap();
    {
        let mut savepoint = tx.savepoint().await.unwrap();
        let topic = savepoint.upsert_topic(1, "Screen", "screen(0.30)").await.unwrap();
        savepoint.link_review_topic(1, topic, 0.8).await.unwrap();
        assert!(savepoint.link_review_topic(999, topic, 0.8).await.is_err());
    }
    {
        let mut savepoint = tx.savepoint().await.unwrap();
        savepoint.upsert_topic(1, "Camera", "camera(0.20)").await.unwrap();
        savepoint.commit().await.unwrap();
    }
    tx.commit().await.unwrap();

    let labels: Vec<String> = store
        .topic_summaries(Some(1))
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.topic_label)
        .collect();
    assert_eq!(labels.len(), 2);
    assert!(labels.contains(&"Battery".to_string()));
    assert!(labels.contains(&"Camera".to_string()));
    assert_eq!(store.stats().await.unwrap().topics, 2);
}

#[tokio::test]
async fn test_search_by_review_text_and_filters() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();
    store.upsert_sentiment(1, SentimentLabel::Positive, 0.9).await.unwrap();

    let hits = store
        .search_phones(&PhoneSearch {
            query: "battery".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].phone_name, "Rocket 5");
    assert_eq!(hits[0].review_count, 1);

    let none = store
        .search_phones(&PhoneSearch {
            query: "battery".to_string(),
            sentiment: Some(SentimentLabel::Negative),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());

    let globex = store
        .list_brands()
        .await
        .unwrap()
        .into_iter()
        .find(|b| b.brand_name == "Globex")
        .unwrap();
    let by_brand = store
        .search_phones(&PhoneSearch {
            query: "".to_string(),
            brand_id: Some(globex.brand_id),
            min_reviews: Some(1),
            limit: Some(20),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_brand.len(), 1);
    assert_eq!(by_brand[0].phone_name, "Orbit");
}

#[tokio::test]
async fn test_topic_candidates_respect_minimum() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();

    let candidates = store.topic_candidates(2).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].phone_name, "Rocket 5");
    assert_eq!(candidates[0].review_count, 3);

    assert_eq!(store.phone_reviews(candidates[0].phone_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_clear_derived_keeps_reviews() {
    let (store, _dir) = open_store().await;
    store.import_csv(SAMPLE_CSV.as_bytes(), b',').await.unwrap();
    store.upsert_sentiment(1, SentimentLabel::Positive, 0.9).await.unwrap();
    let mut tx = store.begin().await.unwrap();
    let topic = tx.upsert_topic(1, "Battery", "battery(0.50)").await.unwrap();
    tx.link_review_topic(1, topic, 0.5).await.unwrap();
    tx.commit().await.unwrap();

    let report = store.clear_derived().await.unwrap();
    assert_eq!(report.review_topics, 1);
    assert_eq!(report.topics, 1);
    assert_eq!(report.sentiments, 1);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.reviews, 4);
    assert_eq!(stats.topics, 0);
    assert_eq!(stats.processed_sentiments, 0);
}

#[tokio::test]
async fn test_uncommitted_transaction_rolls_back() {
    let (store, _dir) = open_store().await;
    {
        let mut tx = store.begin().await.unwrap();
        tx.get_or_create_brand("Ghost").await.unwrap();
    }
    assert!(store.list_brands().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_require_phone() {
    let (store, _dir) = open_store().await;
    let err = store.require_phone(42).await.unwrap_err();
    assert!(err.is_not_found());
}
