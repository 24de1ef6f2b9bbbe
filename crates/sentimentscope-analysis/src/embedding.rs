//! Sentence embeddings for topic modeling

use candle_core::{Device, Tensor};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use sentimentscope_core::{Error, Result};
use tokenizers::{Tokenizer, TruncationDirection};

use crate::model_loader::{load_tokenizer, load_var_builder, parse_json_config, ModelConfig};

/// Maps text to a fixed-size, L2-normalized vector
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts; row `i` belongs to `texts[i]`
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Model name
    fn name(&self) -> &str;
}

/// Sentence-transformer (MiniLM) BERT encoder with masked mean pooling
pub struct MiniLmEmbedder {
    name: String,
    tokenizer: Tokenizer,
    model: BertModel,
    device: Device,
    max_length: usize,
}

impl MiniLmEmbedder {
    /// Resolve (downloading if needed) and load the encoder described by `config`
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let model_path = config.resolve()?;
        let tokenizer = load_tokenizer(&model_path)?;
        let bert_config: BertConfig = parse_json_config(&model_path.join("config.json"))?;

        let device = config.device.to_device()?;
        let vb = load_var_builder(&model_path, &device)?;

        let mut errors = Vec::new();
        let mut model = None;
        for prefix in ["", "bert"] {
            let vb_prefix = if prefix.is_empty() {
                vb.clone()
            } else {
                vb.pp(prefix)
            };
            match BertModel::load(vb_prefix, &bert_config) {
                Ok(loaded) => {
                    model = Some(loaded);
                    break;
                }
                Err(e) => errors.push(format!(
                    "{}: {}",
                    if prefix.is_empty() { "<root>" } else { prefix },
                    e
                )),
            }
        }

        let model = model.ok_or_else(|| {
            Error::model(format!(
                "Failed to load BERT encoder with tried prefixes [{}]",
                errors.join(" | ")
            ))
        })?;

        tracing::info!(model = %config.display_name(), "Loaded sentence embedding model");

        Ok(Self {
            name: config.display_name(),
            tokenizer,
            model,
            device,
            max_length: config.max_length,
        })
    }
}

impl Embedder for MiniLmEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;
        encoding.truncate(self.max_length, 0, TruncationDirection::Right);

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::embedding(format!("Failed to create input ids tensor: {}", e)))?;

        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| {
                Error::embedding(format!("Failed to create token type ids tensor: {}", e))
            })?;

        let mask: Vec<u32> = encoding.get_attention_mask().to_vec();
        let attention_mask = Tensor::new(mask.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::embedding(format!("Failed to create attention mask: {}", e)))?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| Error::embedding(format!("Model forward pass failed: {}", e)))?;

        let token_embeddings: Vec<Vec<f32>> = hidden_states
            .squeeze(0)
            .and_then(|t| t.to_vec2())
            .map_err(|e| Error::embedding(format!("Failed to read hidden states: {}", e)))?;

        let mut pooled = mean_pool_embeddings(&token_embeddings, &mask);
        l2_normalize(&mut pooled);
        Ok(pooled)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Average token embeddings whose attention mask is set; all tokens when none is
pub fn mean_pool_embeddings(sequence_embeddings: &[Vec<f32>], attention_mask: &[u32]) -> Vec<f32> {
    let Some(first) = sequence_embeddings.first() else {
        return Vec::new();
    };

    let mut pooled = vec![0.0f32; first.len()];
    let mut token_count = 0.0f32;

    for (idx, embedding) in sequence_embeddings.iter().enumerate() {
        if attention_mask.get(idx).copied().unwrap_or(0) == 0 {
            continue;
        }
        token_count += 1.0;
        for (acc, value) in pooled.iter_mut().zip(embedding) {
            *acc += value;
        }
    }

    if token_count == 0.0 {
        token_count = sequence_embeddings.len() as f32;
        for embedding in sequence_embeddings {
            for (acc, value) in pooled.iter_mut().zip(embedding) {
                *acc += value;
            }
        }
    }

    for value in &mut pooled {
        *value /= token_count;
    }

    pooled
}

/// Scale `vector` to unit length in place (zero vectors are left alone)
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity, 0 when either vector has zero length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
