//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use sentimentscope_analysis::{
    ClusterTopicModel, DistilBertClassifier, Embedder, LexiconTagger, MiniLmEmbedder, ModelConfig,
    SentimentAdapter, Tagger, TopicModel,
};
use sentimentscope_store::Store;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{AppConfig, ModelsConfig, PipelineConfig};
use crate::error::AppError;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    pub store: Store,

    /// Analysis models; any of them may be missing
    pub models: Arc<Models>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Store,
        models: Models,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            models: Arc::new(models),
            metrics_handle,
        }
    }

    pub fn sentiment(&self) -> Result<&SentimentAdapter, AppError> {
        self.models
            .sentiment
            .as_ref()
            .ok_or_else(|| AppError::ModelUnavailable("Sentiment model not loaded".to_string()))
    }

    pub fn topic_model(&self) -> Result<Arc<dyn TopicModel>, AppError> {
        self.models.topic_model.clone().ok_or_else(|| {
            AppError::ModelUnavailable("Topic modeling models not loaded".to_string())
        })
    }
}

/// Models constructed at startup and injected into the handlers
#[derive(Default)]
pub struct Models {
    pub sentiment: Option<SentimentAdapter>,
    pub topic_model: Option<Arc<dyn TopicModel>>,
    pub tagger: Option<Arc<dyn Tagger>>,
}

/// Which models are available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelsLoaded {
    pub sentiment: bool,
    pub embedding: bool,
    pub tagger: bool,
}

impl Models {
    /// No models at all; analysis endpoints answer with errors
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_sentiment(mut self, adapter: SentimentAdapter) -> Self {
        self.sentiment = Some(adapter);
        self
    }

    pub fn with_topic_model(mut self, model: Arc<dyn TopicModel>) -> Self {
        self.topic_model = Some(model);
        self
    }

    pub fn with_tagger(mut self, tagger: Arc<dyn Tagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    pub fn loaded(&self) -> ModelsLoaded {
        ModelsLoaded {
            sentiment: self.sentiment.is_some(),
            embedding: self.topic_model.is_some(),
            tagger: self.tagger.is_some(),
        }
    }

    /// Load every model. A model that fails to load is logged and left out,
    /// so only the endpoints depending on it fail.
    pub async fn load(models: &ModelsConfig, pipeline: &PipelineConfig) -> Self {
        let tagger: Arc<dyn Tagger> = Arc::new(LexiconTagger::new());
        let mut loaded = Self::none().with_tagger(tagger);

        if !models.load_on_startup {
            info!("Model loading disabled; analysis endpoints are unavailable");
            return loaded;
        }

        let sentiment_config = model_config(&models.sentiment_model, models);
        match load_blocking(move || DistilBertClassifier::load(&sentiment_config)).await {
            Ok(classifier) => {
                info!("Sentiment model loaded: {}", models.sentiment_model);
                loaded = loaded.with_sentiment(
                    SentimentAdapter::new(Arc::new(classifier))
                        .with_neutral_threshold(pipeline.neutral_threshold),
                );
            }
            Err(e) => error!(model = %models.sentiment_model, error = %e, "Failed to load sentiment model"),
        }

        let embedding_config = model_config(&models.embedding_model, models);
        match load_blocking(move || MiniLmEmbedder::load(&embedding_config)).await {
            Ok(embedder) => {
                info!("Embedding model loaded: {}", models.embedding_model);
                let embedder: Arc<dyn Embedder> = Arc::new(embedder);
                loaded = loaded.with_topic_model(Arc::new(
                    ClusterTopicModel::new(embedder).with_seed(pipeline.seed),
                ));
            }
            Err(e) => error!(model = %models.embedding_model, error = %e, "Failed to load embedding model"),
        }

        loaded
    }
}

fn model_config(reference: &str, models: &ModelsConfig) -> ModelConfig {
    ModelConfig::from_reference(reference)
        .with_device(models.device)
        .with_max_length(models.max_length)
}

async fn load_blocking<T, F>(load: F) -> sentimentscope_core::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> sentimentscope_core::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(load)
        .await
        .map_err(|e| sentimentscope_core::Error::model(format!("model loading task failed: {e}")))?
}
