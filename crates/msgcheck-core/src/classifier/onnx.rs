//! Shared ONNX text-classification runtime.
//!
//! Loads a Hugging Face sequence-classification model exported to ONNX,
//! together with its `tokenizer.json` and `config.json`, and returns the raw
//! logits for a single text.

use std::collections::HashMap;
use std::fs;

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use serde::Deserialize;
use tracing::info;

use super::{ClassifierError, ModelPaths, Result};

/// Subset of a Hugging Face `config.json` needed for inference.
#[derive(Debug, Deserialize)]
struct HfConfig {
    #[serde(default)]
    model_type: Option<String>,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Orders `id2label` entries by their numeric id.
pub(crate) fn ordered_labels(id2label: &HashMap<String, String>) -> Result<Vec<String>> {
    let mut labels = Vec::with_capacity(id2label.len());
    for (id, label) in id2label {
        let id: usize = id
            .parse()
            .map_err(|_| ClassifierError::InvalidConfig(format!("non-numeric label id {}", id)))?;
        labels.push((id, label.clone()));
    }
    labels.sort_by_key(|(id, _)| *id);

    for (expected, (id, _)) in labels.iter().enumerate() {
        if *id != expected {
            return Err(ClassifierError::InvalidConfig(format!(
                "label ids are not contiguous: missing {}",
                expected
            )));
        }
    }

    if labels.is_empty() {
        return Err(ClassifierError::InvalidConfig(
            "config.json has no id2label".to_string(),
        ));
    }

    Ok(labels.into_iter().map(|(_, label)| label).collect())
}

/// BERT-family encoders take a `token_type_ids` input; RoBERTa does not.
fn uses_token_type_ids(model_type: Option<&str>) -> bool {
    matches!(model_type, Some("bert") | Some("albert") | Some("electra"))
}

/// A loaded ONNX sequence classifier.
pub(crate) struct TextClassificationModel {
    session: Session,
    tokenizer: tokenizers::Tokenizer,
    labels: Vec<String>,
    token_type_ids: bool,
    max_length: usize,
}

impl TextClassificationModel {
    /// Loads the model bundle described by `paths`.
    pub(crate) fn load(paths: &ModelPaths) -> Result<Self> {
        if !paths.model_path.exists() {
            return Err(ClassifierError::ModelNotFound(
                paths.model_path.display().to_string(),
            ));
        }
        if !paths.tokenizer_path.exists() {
            return Err(ClassifierError::TokenizerNotFound(
                paths.tokenizer_path.display().to_string(),
            ));
        }
        if !paths.config_path.exists() {
            return Err(ClassifierError::ConfigNotFound(
                paths.config_path.display().to_string(),
            ));
        }

        let config: HfConfig = serde_json::from_str(&fs::read_to_string(&paths.config_path)?)?;
        let labels = ordered_labels(&config.id2label)?;
        let token_type_ids = uses_token_type_ids(config.model_type.as_deref());

        // Load ONNX model with optimizations
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(&paths.model_path)?;

        let tokenizer = tokenizers::Tokenizer::from_file(&paths.tokenizer_path)?;

        info!(
            model = %paths.model_path.display(),
            labels = ?labels,
            "Loaded text classification model"
        );

        Ok(Self {
            session,
            tokenizer,
            labels,
            token_type_ids,
            max_length: paths.max_length,
        })
    }

    /// Label names in logit order.
    pub(crate) fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Runs the model and returns one logit per label.
    pub(crate) fn logits(&mut self, text: &str) -> Result<Vec<f32>> {
        let encoding = self.tokenizer.encode(text, true)?;

        let seq_len = encoding.get_ids().len().min(self.max_length);
        let input_ids: Vec<i64> = encoding.get_ids()[..seq_len]
            .iter()
            .map(|&id| id as i64)
            .collect();
        let attention_mask: Vec<i64> = encoding.get_attention_mask()[..seq_len]
            .iter()
            .map(|&m| m as i64)
            .collect();

        // Create ONNX tensors with shape [1, seq_len]
        let input_ids_tensor = Tensor::from_array(([1, seq_len], input_ids.into_boxed_slice()))?;
        let attention_mask_tensor =
            Tensor::from_array(([1, seq_len], attention_mask.into_boxed_slice()))?;

        let outputs = if self.token_type_ids {
            let type_ids = vec![0i64; seq_len];
            let type_ids_tensor = Tensor::from_array(([1, seq_len], type_ids.into_boxed_slice()))?;
            self.session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => type_ids_tensor
            ])?
        } else {
            self.session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])?
        };

        let (shape, data) = outputs["logits"].try_extract_tensor::<f32>().map_err(|e| {
            ClassifierError::InferenceError(format!("Failed to extract logits: {}", e))
        })?;

        // Expect shape [1, num_labels]
        let dims: Vec<_> = shape.iter().collect();
        if dims.len() != 2 || *dims[0] != 1 || *dims[1] as usize != self.labels.len() {
            return Err(ClassifierError::InferenceError(format!(
                "Unexpected output shape: {:?}",
                dims
            )));
        }

        Ok(data.to_vec())
    }
}

/// Element-wise logistic function for multi-label heads.
pub(crate) fn sigmoid(logits: &[f32]) -> Vec<f32> {
    logits.iter().map(|&x| 1.0 / (1.0 + (-x).exp())).collect()
}

/// Softmax over all logits for single-label heads.
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
