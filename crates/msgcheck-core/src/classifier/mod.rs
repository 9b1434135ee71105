//! Message classification.
//!
//! The cascade in [`MessageClassifier`] consults a [`ToxicityScorer`] first
//! and only falls back to a [`SentimentScorer`] when the message is not toxic.

mod cascade;
mod error;
mod label;
#[cfg(feature = "ml")]
mod onnx;
mod scores;
mod sentiment;
mod toxicity;

pub use cascade::{
    decide_sentiment, decide_toxic, Classification, MessageClassifier, Thresholds,
    SARCASM_MARKER,
};
pub use error::{ClassifierError, Result};
pub use label::Label;
pub use scores::{
    SentimentPolarity, SentimentResult, ToxicityScores, INSULT, OBSCENE, SEVERE_TOXIC, THREAT,
    TOXIC,
};
pub use sentiment::{OnnxSentimentScorer, SentimentScorer};
pub use toxicity::{OnnxToxicityScorer, ToxicityScorer};

use std::path::{Path, PathBuf};

/// File locations of an exported text-classification model bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    /// Path to the ONNX model file.
    pub model_path: PathBuf,
    /// Path to the tokenizer.json file.
    pub tokenizer_path: PathBuf,
    /// Path to the Hugging Face config.json (label names, model type).
    pub config_path: PathBuf,
    /// Maximum sequence length (tokens).
    pub max_length: usize,
}

impl ModelPaths {
    /// Default maximum sequence length for BERT-sized encoders.
    pub const DEFAULT_MAX_LENGTH: usize = 512;

    /// Standard bundle layout: `model.onnx`, `tokenizer.json`, `config.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_path: dir.join("model.onnx"),
            tokenizer_path: dir.join("tokenizer.json"),
            config_path: dir.join("config.json"),
            max_length: Self::DEFAULT_MAX_LENGTH,
        }
    }

    /// Returns true if every file of the bundle is present.
    pub fn is_complete(&self) -> bool {
        self.model_path.exists() && self.tokenizer_path.exists() && self.config_path.exists()
    }
}
