//! HTTP routers for the query and pipeline surfaces

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::state::AppState;

mod pipeline;
mod query;

pub use pipeline::create_pipeline_router;
pub use query::create_query_router;

/// Prometheus text exposition
async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// Count requests by surface, matched route and status
async fn track_requests(surface: &'static str, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(req).await;

    metrics::counter!(
        "sentimentscope_requests_total",
        "surface" => surface,
        "method" => method,
        "path" => path,
        "status" => response.status().as_u16().to_string(),
    )
    .increment(1);

    response
}

/// CORS for the configured origins; any origin when none are configured
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
