//! DistilBERT sequence classifier (SST-2 sentiment) on candle

use async_trait::async_trait;
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Linear, Module};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use sentimentscope_core::{Error, Result};
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationDirection};

use crate::classifier::{ClassificationResult, Classifier};
use crate::model_loader::{
    load_tokenizer, load_var_builder, parse_json_config, to_probabilities, ModelConfig,
};

/// Pretrained DistilBERT with its `pre_classifier` / `classifier` head
pub struct DistilBertClassifier {
    name: String,
    tokenizer: Tokenizer,
    model: DistilBertModel,
    pre_classifier: Option<Linear>,
    classifier: Linear,
    device: Device,
    labels: Vec<String>,
    max_length: usize,
}

impl DistilBertClassifier {
    /// Resolve (downloading if needed) and load the model described by `config`
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let model_path = config.resolve()?;
        let tokenizer = load_tokenizer(&model_path)?;

        let config_path = model_path.join("config.json");
        let config_json: serde_json::Value = parse_json_config(&config_path)?;
        let distilbert_config: DistilBertConfig = parse_json_config(&config_path)?;

        let hidden_size = config_json
            .get("dim")
            .or_else(|| config_json.get("hidden_size"))
            .and_then(|v| v.as_u64())
            .unwrap_or(768) as usize;
        let labels = labels_from_config(&config_json);

        let device = config.device.to_device()?;
        let vb = load_var_builder(&model_path, &device)?;

        let model = DistilBertModel::load(vb.pp("distilbert"), &distilbert_config)
            .map_err(|e| Error::model(format!("Failed to load DistilBERT model: {}", e)))?;

        let pre_classifier =
            candle_nn::linear(hidden_size, hidden_size, vb.pp("pre_classifier")).ok();
        if pre_classifier.is_some() {
            tracing::debug!("Loaded pre_classifier layer (hidden_size={})", hidden_size);
        }

        let classifier = candle_nn::linear(hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| Error::model(format!("Failed to load classification head: {}", e)))?;

        tracing::info!(
            model = %config.display_name(),
            labels = ?labels,
            "Loaded DistilBERT sentiment classifier"
        );

        Ok(Self {
            name: config.display_name(),
            tokenizer,
            model,
            pre_classifier,
            classifier,
            device,
            labels,
            max_length: config.max_length,
        })
    }

    fn forward(&self, text: &str) -> Result<Vec<f32>> {
        let mut encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::classifier(format!("Tokenization failed: {}", e)))?;
        encoding.truncate(self.max_length, 0, TruncationDirection::Right);

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let input_ids = Tensor::new(input_ids.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::classifier(format!("Failed to create input tensor: {}", e)))?;

        // DistilBERT masks positions flagged with 1.
        let padding_mask: Vec<u8> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| u8::from(x == 0))
            .collect();
        let attention_mask = Tensor::new(padding_mask.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::classifier(format!("Failed to create attention mask: {}", e)))?;

        let hidden_states = self
            .model
            .forward(&input_ids, &attention_mask)
            .map_err(|e| Error::classifier(format!("Model forward pass failed: {}", e)))?;

        let cls_embedding = hidden_states
            .i((0, 0, ..))
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::classifier(format!("Failed to get CLS token: {}", e)))?;

        let pooled = match &self.pre_classifier {
            Some(pre_classifier) => pre_classifier
                .forward(&cls_embedding)
                .and_then(|t| t.relu())
                .map_err(|e| Error::classifier(format!("Pre-classifier failed: {}", e)))?,
            None => cls_embedding,
        };

        let logits = self
            .classifier
            .forward(&pooled)
            .map_err(|e| Error::classifier(format!("Classification head failed: {}", e)))?;

        to_probabilities(&logits)
    }
}

#[async_trait]
impl Classifier for DistilBertClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let probs = self.forward(text)?;

        let mut result = ClassificationResult::from_probabilities(&self.labels, &probs);
        result.model = Some(self.name.clone());
        result.latency_us = start.elapsed().as_micros() as u64;
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Labels ordered by class index from `id2label`, SST-2 order when absent
fn labels_from_config(config: &serde_json::Value) -> Vec<String> {
    let mut labels: Vec<(usize, String)> = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(idx, label)| {
                    Some((idx.parse::<usize>().ok()?, label.as_str()?.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    if labels.is_empty() {
        return vec!["NEGATIVE".to_string(), "POSITIVE".to_string()];
    }

    labels.sort_by_key(|(idx, _)| *idx);
    labels.into_iter().map(|(_, label)| label).collect()
}
