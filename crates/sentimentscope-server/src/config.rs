//! Application configuration

use sentimentscope_analysis::model_loader::{
    DeviceType, DEFAULT_EMBEDDING_MODEL, DEFAULT_MAX_LENGTH, DEFAULT_SENTIMENT_MODEL,
};
use sentimentscope_core::DEFAULT_NEUTRAL_THRESHOLD;
use sentimentscope_store::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub host: Option<String>,
    pub query_port: Option<u16>,
    pub pipeline_port: Option<u16>,
    pub skip_models: bool,
}

impl AppConfig {
    /// Load configuration from file (defaults when it does not exist) and
    /// apply overrides
    pub fn load(config_path: impl AsRef<Path>, overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let config_path = config_path.as_ref();
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = &overrides.database {
            self.database.path = path.clone();
        }
        if let Some(host) = &overrides.host {
            self.server.host = host.clone();
        }
        if let Some(port) = overrides.query_port {
            self.server.query_port = port;
        }
        if let Some(port) = overrides.pipeline_port {
            self.server.pipeline_port = port;
        }
        if overrides.skip_models {
            self.models.load_on_startup = false;
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let threshold = self.pipeline.neutral_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("pipeline.neutral_threshold must be within [0, 1], got {threshold}");
        }
        let fallback = self.pipeline.fallback_relevance;
        if !(0.0..=1.0).contains(&fallback) {
            anyhow::bail!("pipeline.fallback_relevance must be within [0, 1], got {fallback}");
        }
        if self.server.query_port == self.server.pipeline_port {
            anyhow::bail!(
                "query and pipeline surfaces cannot share port {}",
                self.server.query_port
            );
        }
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_query_port")]
    pub query_port: u16,

    #[serde(default = "default_pipeline_port")]
    pub pipeline_port: u16,

    /// CORS origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Largest accepted `POST /import` body
    #[serde(default = "default_max_import_bytes")]
    pub max_import_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            query_port: default_query_port(),
            pipeline_port: default_pipeline_port(),
            allowed_origins: Vec::new(),
            max_import_bytes: default_max_import_bytes(),
        }
    }
}

/// Pretrained model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Hugging Face repo id or local directory
    #[serde(default = "default_sentiment_model")]
    pub sentiment_model: String,

    /// Hugging Face repo id or local directory
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default)]
    pub device: DeviceType,

    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Load models when the server starts; endpoints that need a missing
    /// model answer with an error
    #[serde(default = "default_true")]
    pub load_on_startup: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            sentiment_model: default_sentiment_model(),
            embedding_model: default_embedding_model(),
            device: DeviceType::default(),
            max_length: default_max_length(),
            load_on_startup: true,
        }
    }
}

/// Batch pass settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Confidence below which binary verdicts become neutral
    #[serde(default = "default_neutral_threshold")]
    pub neutral_threshold: f32,

    /// Reviews fetched per sentiment pass
    #[serde(default = "default_sentiment_batch_limit")]
    pub sentiment_batch_limit: u32,

    /// Reviews a phone needs before the topic pass looks at it
    #[serde(default = "default_min_reviews_per_phone")]
    pub min_reviews_per_phone: u32,

    /// Cleaned reviews a phone needs for topic modeling
    #[serde(default = "default_min_clean_reviews")]
    pub min_clean_reviews: usize,

    /// Words a cleaned review needs to count for topic modeling
    #[serde(default = "default_min_words")]
    pub min_words_per_review: usize,

    /// Relevance stored when the topic model gives no probabilities
    #[serde(default = "default_fallback_relevance")]
    pub fallback_relevance: f32,

    /// Log progress every this many classified reviews
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Seed for clustering
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            neutral_threshold: default_neutral_threshold(),
            sentiment_batch_limit: default_sentiment_batch_limit(),
            min_reviews_per_phone: default_min_reviews_per_phone(),
            min_clean_reviews: default_min_clean_reviews(),
            min_words_per_review: default_min_words(),
            fallback_relevance: default_fallback_relevance(),
            progress_interval: default_progress_interval(),
            seed: default_seed(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_query_port() -> u16 {
    8000
}

fn default_pipeline_port() -> u16 {
    8001
}

fn default_max_import_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_sentiment_model() -> String {
    DEFAULT_SENTIMENT_MODEL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_true() -> bool {
    true
}

fn default_neutral_threshold() -> f32 {
    DEFAULT_NEUTRAL_THRESHOLD
}

fn default_sentiment_batch_limit() -> u32 {
    10_000
}

fn default_min_reviews_per_phone() -> u32 {
    10
}

fn default_min_clean_reviews() -> usize {
    10
}

fn default_min_words() -> usize {
    5
}

fn default_fallback_relevance() -> f32 {
    0.5
}

fn default_progress_interval() -> usize {
    100
}

fn default_seed() -> u64 {
    42
}
