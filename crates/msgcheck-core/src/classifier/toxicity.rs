//! Multi-label toxicity scoring.
//!
//! The ONNX scorer targets Jigsaw-style models such as `unitary/toxic-bert`,
//! which emit one independent logit per category (`toxic`, `severe_toxic`,
//! `obscene`, `threat`, `insult`, `identity_hate`).

use super::{ModelPaths, Result, ToxicityScores};

#[cfg(feature = "ml")]
use super::onnx::{sigmoid, TextClassificationModel};
#[cfg(feature = "ml")]
use super::ClassifierError;

/// Produces per-category toxicity probabilities for a text.
pub trait ToxicityScorer: Send {
    /// Scores the given text.
    fn score(&mut self, text: &str) -> Result<ToxicityScores>;

    /// Returns the name of this scorer for logging/debugging.
    fn name(&self) -> &str;
}

/// Toxicity scorer backed by an ONNX model bundle.
#[cfg(feature = "ml")]
pub struct OnnxToxicityScorer {
    model: TextClassificationModel,
    categories: Vec<String>,
    name: String,
}

#[cfg(feature = "ml")]
impl OnnxToxicityScorer {
    /// Loads the model bundle.
    ///
    /// Returns an error if any bundle file is missing or unreadable.
    pub fn new(paths: ModelPaths) -> Result<Self> {
        let model = TextClassificationModel::load(&paths)?;
        let categories: Vec<String> = model.labels().iter().map(|l| l.to_lowercase()).collect();

        if !categories.iter().any(|c| c == super::TOXIC) {
            return Err(ClassifierError::InvalidConfig(format!(
                "toxicity model has no '{}' label (labels: {:?})",
                super::TOXIC,
                categories
            )));
        }

        Ok(Self {
            model,
            categories,
            name: bundle_name(&paths),
        })
    }

    /// Attempts to load the scorer, returning None on failure.
    pub fn try_load(paths: ModelPaths) -> Option<Self> {
        match Self::new(paths) {
            Ok(scorer) => Some(scorer),
            Err(e) => {
                tracing::warn!("Toxicity model unavailable: {}", e);
                None
            }
        }
    }
}

#[cfg(feature = "ml")]
impl ToxicityScorer for OnnxToxicityScorer {
    fn score(&mut self, text: &str) -> Result<ToxicityScores> {
        let probabilities = sigmoid(&self.model.logits(text)?);
        Ok(self
            .categories
            .iter()
            .cloned()
            .zip(probabilities)
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Stub scorer when ML feature is not enabled.
#[cfg(not(feature = "ml"))]
pub struct OnnxToxicityScorer {
    _paths: ModelPaths,
}

#[cfg(not(feature = "ml"))]
impl OnnxToxicityScorer {
    /// Creates a stub scorer (ML feature not enabled).
    pub fn new(_paths: ModelPaths) -> Result<Self> {
        Err(super::ClassifierError::MlNotEnabled)
    }

    /// Attempts to load the scorer (always returns None when ML is disabled).
    pub fn try_load(_paths: ModelPaths) -> Option<Self> {
        None
    }
}

#[cfg(not(feature = "ml"))]
impl ToxicityScorer for OnnxToxicityScorer {
    fn score(&mut self, _text: &str) -> Result<ToxicityScores> {
        Err(super::ClassifierError::MlNotEnabled)
    }

    fn name(&self) -> &str {
        "onnx-toxicity (disabled)"
    }
}

/// Names a scorer after the directory holding its bundle.
#[cfg(any(feature = "ml", test))]
pub(crate) fn bundle_name(paths: &ModelPaths) -> String {
    paths
        .model_path
        .parent()
        .and_then(|dir| dir.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| paths.model_path.display().to_string())
}
