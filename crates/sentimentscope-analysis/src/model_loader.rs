//! Model resolution and loading helpers for the candle-backed models

use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use hf_hub::{api::sync::Api, Repo, RepoType};
use sentimentscope_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default pretrained sentiment model
pub const DEFAULT_SENTIMENT_MODEL: &str = "distilbert-base-uncased-finetuned-sst-2-english";

/// Default sentence embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Default token budget; longer inputs are truncated on the right
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Configuration for loading a model
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Where the weights come from
    pub source: ModelSource,

    /// Device to run inference on
    pub device: DeviceType,

    /// Token budget per input
    pub max_length: usize,
}

/// Source location for model weights
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Directory containing config.json, model.safetensors and a tokenizer
    LocalPath(PathBuf),

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
    },
}

/// Device type for inference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference (first device)
    Cuda,
    /// Metal (Apple Silicon)
    Metal,
}

impl ModelConfig {
    /// Create a new model configuration from a local directory
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::LocalPath(path.into()),
            device: DeviceType::Cpu,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Create a new model configuration from Hugging Face
    pub fn from_hf(repo_id: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo_id: repo_id.into(),
                revision: None,
            },
            device: DeviceType::Cpu,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Resolve a model reference: an existing directory is used as-is,
    /// anything else is treated as a Hugging Face repo id.
    pub fn from_reference(reference: &str) -> Self {
        let path = Path::new(reference);
        if path.is_dir() {
            Self::from_local(path)
        } else {
            Self::from_hf(reference)
        }
    }

    /// Set device
    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    /// Set token budget
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set Hugging Face revision
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        if let ModelSource::HuggingFace { repo_id, .. } = self.source {
            self.source = ModelSource::HuggingFace {
                repo_id,
                revision: Some(revision.into()),
            };
        }
        self
    }

    /// Human-readable model name
    pub fn display_name(&self) -> String {
        match &self.source {
            ModelSource::LocalPath(path) => path.display().to_string(),
            ModelSource::HuggingFace { repo_id, .. } => repo_id.clone(),
        }
    }

    /// Make the model files available locally and return their directory
    pub fn resolve(&self) -> Result<PathBuf> {
        match &self.source {
            ModelSource::LocalPath(path) => {
                if !path.exists() {
                    return Err(Error::model(format!(
                        "Model path does not exist: {}",
                        path.display()
                    )));
                }
                Ok(path.clone())
            }
            ModelSource::HuggingFace { repo_id, revision } => {
                download_from_huggingface(repo_id, revision.as_deref())
            }
        }
    }
}

impl DeviceType {
    /// Instantiate the candle device
    pub fn to_device(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda => Device::new_cuda(0)
                .map_err(|e| Error::model(format!("Failed to initialize CUDA: {}", e))),
            Self::Metal => Device::new_metal(0)
                .map_err(|e| Error::model(format!("Failed to initialize Metal: {}", e))),
        }
    }
}

fn download_from_huggingface(repo_id: &str, revision: Option<&str>) -> Result<PathBuf> {
    tracing::info!("Downloading model from HuggingFace: {}", repo_id);

    let api = Api::new()
        .map_err(|e| Error::model(format!("Failed to initialize HuggingFace API: {}", e)))?;

    let repo = match revision {
        Some(rev) => api.repo(Repo::with_revision(
            repo_id.to_string(),
            RepoType::Model,
            rev.to_string(),
        )),
        None => api.repo(Repo::model(repo_id.to_string())),
    };

    let config_path = repo
        .get("config.json")
        .map_err(|e| Error::model(format!("Failed to download config.json: {}", e)))?;

    repo.get("model.safetensors")
        .map_err(|e| Error::model(format!("Failed to download model.safetensors: {}", e)))?;

    let mut found_tokenizer = false;
    for file in ["tokenizer.json", "vocab.txt"] {
        match repo.get(file) {
            Ok(_) => {
                tracing::debug!("Found tokenizer file: {}", file);
                found_tokenizer = true;
                break;
            }
            Err(_) => tracing::debug!("File not found: {}", file),
        }
    }

    if !found_tokenizer {
        return Err(Error::model(
            "No tokenizer found (tried tokenizer.json, vocab.txt)",
        ));
    }

    let model_dir = config_path
        .parent()
        .ok_or_else(|| Error::model("Invalid cache path"))?;

    tracing::info!("Model available at: {}", model_dir.display());
    Ok(model_dir.to_path_buf())
}

/// Read and deserialize a model's config.json
pub(crate) fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

/// Memory-map model.safetensors from `model_path`
pub(crate) fn load_var_builder(model_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_path.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::model(format!(
            "model.safetensors not found in {}",
            model_path.display()
        )));
    }

    // SAFETY: the weights file is not modified while mapped.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::model(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

/// Load tokenizer.json, falling back to a BERT WordPiece tokenizer built from vocab.txt
pub(crate) fn load_tokenizer(model_path: &Path) -> Result<tokenizers::Tokenizer> {
    use tokenizers::Tokenizer;

    let tokenizer_json_path = model_path.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(|e| Error::model(format!("Failed to load tokenizer.json: {}", e)));
    }

    let vocab_path = model_path.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| Error::model(format!("Failed to build WordPiece model: {}", e)))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

        let sep = ("[SEP]".to_string(), 102);
        let cls = ("[CLS]".to_string(), 101);
        tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

        return Ok(tokenizer);
    }

    Err(Error::model(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
        model_path.display()
    )))
}

/// Softmax over the last dimension of a `(1, n)` logits tensor
pub(crate) fn to_probabilities(logits: &Tensor) -> Result<Vec<f32>> {
    candle_nn::ops::softmax(logits, D::Minus1)
        .map_err(|e| Error::classifier(format!("Softmax failed: {}", e)))?
        .squeeze(0)
        .map_err(|e| Error::classifier(format!("Squeeze failed: {}", e)))?
        .to_vec1()
        .map_err(|e| Error::classifier(format!("Failed to convert to vec: {}", e)))
}
