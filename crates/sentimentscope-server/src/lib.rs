//! SentimentScope Server
//!
//! Two HTTP surfaces over the review database:
//!
//! - the query router (brands, phones, reviews, sentiment and topic
//!   summaries, search)
//! - the pipeline router (single-text analysis, batch sentiment and topic
//!   passes, CSV import, clearing derived data)
//!
//! The `sentimentscope` binary wires them to configuration, tracing and a
//! Prometheus recorder.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ConfigOverrides};
pub use error::AppError;
pub use routes::{create_pipeline_router, create_query_router};
pub use state::{AppState, Models};
