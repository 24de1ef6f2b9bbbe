//! Pipeline control surface: analysis, batch passes, import and cleanup

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, Request, State},
    middleware::{self, Next},
    routing::{delete, get, post},
    Json, Router,
};
use sentimentscope_analysis::extract_text_topics;
use sentimentscope_store::ImportReport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{cors_layer, metrics, track_requests};
use crate::error::AppError;
use crate::pipeline::{self, ProcessAllReport, SentimentPassReport, TopicPassReport};
use crate::state::AppState;

pub fn create_pipeline_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);
    let max_import_bytes = state.config.server.max_import_bytes;

    Router::new()
        .route("/", get(health_check))
        .route("/analyze-text", post(analyze_text))
        .route("/run-sentiment", post(process_sentiments))
        .route("/run-topics", post(process_topics))
        .route("/process-sentiments", post(process_sentiments))
        .route("/process-topics", post(process_topics))
        .route("/process-all", post(process_all))
        .route("/clear-all", delete(clear_all))
        .route("/status", get(status))
        .route(
            "/import",
            post(import)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_import_bytes)),
        )
        .route("/metrics", get(metrics))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            track_requests("pipeline", req, next)
        }))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "models_loaded": state.models.loaded(),
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeTextRequest {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeTextResponse {
    sentiment: String,
    confidence: f32,
    topics: Vec<String>,
}

/// Sentiment plus a best-effort topic label for one text
async fn analyze_text(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalyzeTextResponse>, AppError> {
    let adapter = state.sentiment()?;

    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Text is required".to_string()));
    }

    let verdict = adapter.analyze(text).await?;
    let topics = state
        .models
        .tagger
        .as_deref()
        .map(|tagger| extract_text_topics(text, tagger))
        .unwrap_or_default();

    Ok(Json(AnalyzeTextResponse {
        sentiment: verdict.label.to_string(),
        confidence: verdict.confidence,
        topics,
    }))
}

async fn process_sentiments(
    State(state): State<AppState>,
) -> Result<Json<SentimentPassReport>, AppError> {
    Ok(Json(pipeline::run_sentiment_pass(&state).await?))
}

async fn process_topics(State(state): State<AppState>) -> Result<Json<TopicPassReport>, AppError> {
    Ok(Json(pipeline::run_topic_pass(&state).await?))
}

async fn process_all(State(state): State<AppState>) -> Result<Json<ProcessAllReport>, AppError> {
    Ok(Json(pipeline::run_all(&state).await?))
}

async fn clear_all(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let report = state.store.clear_derived().await?;
    warn!(
        review_topics = report.review_topics,
        topics = report.topics,
        sentiments = report.sentiments,
        "All processed data cleared"
    );
    Ok(Json(json!({ "status": "All processed data cleared" })))
}

async fn status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let status = state.store.processing_status().await?;
    Ok(Json(json!({
        "total_reviews": status.total_reviews,
        "processed_sentiments": status.processed_sentiments,
        "unprocessed_reviews": status.unprocessed_reviews,
        "total_topics": status.total_topics,
        "sentiment_percentage": status.sentiment_percentage,
    })))
}

#[derive(Debug, Deserialize)]
struct ImportParams {
    delimiter: Option<String>,
}

/// Import a CSV request body
async fn import(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    let delimiter = parse_delimiter(params.delimiter.as_deref())?;
    info!(bytes = body.len(), "Importing reviews from request body");
    let report = pipeline::import_reviews(&state.store, body.as_ref(), delimiter).await?;
    Ok(Json(report))
}

/// A single ASCII character; `\t` and `tab` mean a tab
pub(crate) fn parse_delimiter(raw: Option<&str>) -> Result<u8, AppError> {
    match raw {
        None | Some("") => Ok(b','),
        Some("\\t") | Some("tab") => Ok(b'\t'),
        Some(s) if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        Some(s) => Err(AppError::BadRequest(format!(
            "delimiter must be a single ASCII character, got {s:?}"
        ))),
    }
}
