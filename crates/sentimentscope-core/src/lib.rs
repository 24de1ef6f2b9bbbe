//! SentimentScope Core
//!
//! Core types and utilities shared across SentimentScope components.
//!
//! This crate provides:
//! - Error types and result handling
//! - The three-class sentiment label and its binary remapping rule
//! - Star rating and percentage derivation used by the query layer

pub mod error;
pub mod rating;
pub mod types;

pub use error::{Error, Result};
pub use rating::{percentage, round1, star_rating, NEUTRAL_STAR_RATING};
pub use types::{SentimentLabel, DEFAULT_NEUTRAL_THRESHOLD};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::rating::star_rating;
    pub use crate::types::SentimentLabel;
}
