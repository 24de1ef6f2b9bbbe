//! SentimentScope Store
//!
//! Relational storage for brands, phones, reviews and the derived
//! sentiment/topic data, plus the read-only aggregation queries served by
//! the query API.

pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod queries;
pub mod schema;

pub use db::{DatabaseConfig, Store, StoreTx};
pub use error::{Result, StoreError};
pub use import::ImportReport;
pub use models::*;
pub use schema::SCHEMA_SQL;
