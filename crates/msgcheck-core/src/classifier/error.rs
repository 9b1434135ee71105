//! Classifier error types.

use thiserror::Error;

/// Error types for model loading and inference.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model file not found.
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Tokenizer file not found.
    #[error("Tokenizer file not found: {0}")]
    TokenizerNotFound(String),

    /// Model config file not found.
    #[error("Model config not found: {0}")]
    ConfigNotFound(String),

    /// Model config could not be interpreted.
    #[error("Invalid model config: {0}")]
    InvalidConfig(String),

    /// ONNX runtime error.
    #[cfg(feature = "ml")]
    #[error("ONNX runtime error: {0}")]
    OrtError(#[from] ort::Error),

    /// Tokenizer error.
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    /// Reading a model bundle file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Inference error.
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// ML feature not enabled.
    #[error("ML feature not enabled - rebuild with --features ml")]
    MlNotEnabled,
}

#[cfg(feature = "ml")]
impl From<tokenizers::Error> for ClassifierError {
    fn from(e: tokenizers::Error) -> Self {
        ClassifierError::TokenizerError(e.to_string())
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(e: serde_json::Error) -> Self {
        ClassifierError::InvalidConfig(e.to_string())
    }
}

/// Result type for classifier operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;
