//! Read-only query surface

use axum::{
    extract::{Path, Query, Request, State},
    middleware::{self, Next},
    routing::get,
    Json, Router,
};
use sentimentscope_core::SentimentLabel;
use sentimentscope_store::{
    Brand, CompletePhoneView, DatabaseStats, PhoneFilter, PhoneSearch, PhoneSummary,
    ReviewRecord, SentimentSummary, TopicSummary,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{cors_layer, metrics, track_requests};
use crate::error::AppError;
use crate::state::AppState;

pub fn create_query_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);

    Router::new()
        .route("/", get(health_check))
        .route("/stats", get(stats))
        .route("/brands", get(brands))
        .route("/phones", get(phones))
        .route("/phones/:phone_id/complete", get(complete_phone))
        .route("/search", get(search))
        .route("/reviews", get(reviews))
        .route("/reviews/unprocessed", get(unprocessed_reviews))
        .route("/sentiments", get(sentiments))
        .route("/topics", get(topics))
        .route("/ml-status", get(ml_status))
        .route("/metrics", get(metrics))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            track_requests("query", req, next)
        }))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "SentimentScope API is running",
    }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<DatabaseStats>, AppError> {
    Ok(Json(state.store.stats().await?))
}

async fn brands(State(state): State<AppState>) -> Result<Json<Vec<Brand>>, AppError> {
    let brands = state.store.list_brands().await?;
    info!("Retrieved {} brands", brands.len());
    Ok(Json(brands))
}

#[derive(Debug, Deserialize)]
struct PhonesParams {
    brand_id: Option<i64>,
    search: Option<String>,
    limit: Option<u32>,
}

async fn phones(
    State(state): State<AppState>,
    Query(params): Query<PhonesParams>,
) -> Result<Json<Vec<PhoneSummary>>, AppError> {
    let filter = PhoneFilter {
        brand_id: params.brand_id,
        search: params.search,
        limit: params.limit,
    };
    let phones = state.store.list_phones(&filter).await?;
    info!("Retrieved {} phones", phones.len());
    Ok(Json(phones))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    sentiment_filter: Option<String>,
    brand_filter: Option<i64>,
    min_reviews: Option<u32>,
    #[serde(default = "default_search_limit")]
    limit: u32,
}

fn default_search_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    total_results: usize,
    phones: Vec<PhoneSummary>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let sentiment = match params.sentiment_filter.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<SentimentLabel>().map_err(|_| {
            AppError::BadRequest(format!(
                "sentiment_filter must be positive, neutral or negative, got {raw:?}"
            ))
        })?),
    };

    let search = PhoneSearch {
        query: params.query.clone(),
        sentiment,
        brand_id: params.brand_filter,
        min_reviews: params.min_reviews.filter(|&n| n > 0),
        limit: Some(params.limit),
    };
    let phones = state.store.search_phones(&search).await?;
    info!("Search for '{}' returned {} results", params.query, phones.len());

    Ok(Json(SearchResponse {
        query: params.query,
        total_results: phones.len(),
        phones,
    }))
}

#[derive(Debug, Deserialize)]
struct ReviewsParams {
    phone_id: Option<i64>,
    #[serde(default = "default_review_limit")]
    limit: u32,
    #[serde(default = "default_true")]
    with_sentiment: bool,
}

fn default_review_limit() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

async fn reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewsParams>,
) -> Result<Json<Vec<ReviewRecord>>, AppError> {
    if let Some(phone_id) = params.phone_id {
        ensure_phone(&state, phone_id).await?;
    }
    let reviews = state
        .store
        .list_reviews(params.phone_id, Some(params.limit), params.with_sentiment)
        .await?;
    info!("Retrieved {} reviews", reviews.len());
    Ok(Json(reviews))
}

#[derive(Debug, Deserialize)]
struct UnprocessedParams {
    #[serde(default = "default_review_limit")]
    limit: u32,
}

async fn unprocessed_reviews(
    State(state): State<AppState>,
    Query(params): Query<UnprocessedParams>,
) -> Result<Json<Vec<ReviewRecord>>, AppError> {
    let reviews = state.store.unprocessed_reviews(Some(params.limit)).await?;
    info!("Retrieved {} unprocessed reviews", reviews.len());
    Ok(Json(reviews))
}

#[derive(Debug, Deserialize)]
struct PhoneParams {
    phone_id: Option<i64>,
}

async fn sentiments(
    State(state): State<AppState>,
    Query(params): Query<PhoneParams>,
) -> Result<Json<SentimentSummary>, AppError> {
    if let Some(phone_id) = params.phone_id {
        ensure_phone(&state, phone_id).await?;
    }
    Ok(Json(state.store.sentiment_summary(params.phone_id).await?))
}

async fn topics(
    State(state): State<AppState>,
    Query(params): Query<PhoneParams>,
) -> Result<Json<Vec<TopicSummary>>, AppError> {
    if let Some(phone_id) = params.phone_id {
        ensure_phone(&state, phone_id).await?;
    }
    Ok(Json(state.store.topic_summaries(params.phone_id).await?))
}

async fn complete_phone(
    State(state): State<AppState>,
    Path(phone_id): Path<i64>,
) -> Result<Json<CompletePhoneView>, AppError> {
    state
        .store
        .complete_view(phone_id)
        .await?
        .map(Json)
        .ok_or_else(AppError::phone_not_found)
}

async fn ml_status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let status = state.store.processing_status().await?;
    Ok(Json(json!({
        "total_reviews": status.total_reviews,
        "processed_sentiments": status.processed_sentiments,
        "unprocessed_reviews": status.unprocessed_reviews,
        "processing_percentage": status.sentiment_percentage,
        "total_topics": status.total_topics,
        "topic_assignments": status.topic_assignments,
    })))
}

async fn ensure_phone(state: &AppState, phone_id: i64) -> Result<(), AppError> {
    match state.store.get_phone(phone_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::phone_not_found()),
    }
}
