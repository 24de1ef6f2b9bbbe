//! Error types for SentimentScope

/// Result type alias using SentimentScope's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SentimentScope analysis operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model download or weight loading errors
    #[error("model error: {0}")]
    Model(String),

    /// Sentiment classifier errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Sentence embedding errors
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Topic model fitting errors
    #[error("topic model error: {0}")]
    TopicModel(String),

    /// Vocabulary construction errors
    #[error("vectorizer error: {0}")]
    Vectorizer(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller supplied something unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model loading error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a new topic model error
    pub fn topic_model(msg: impl Into<String>) -> Self {
        Self::TopicModel(msg.into())
    }

    /// Create a new vectorizer error
    pub fn vectorizer(msg: impl Into<String>) -> Self {
        Self::Vectorizer(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
