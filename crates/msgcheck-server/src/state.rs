//! Application state for the API server.

use std::sync::{Arc, Mutex};

use msgcheck_core::MessageClassifier;

/// Shared application state.
///
/// ONNX sessions need exclusive access to run, so inference is serialized
/// through the mutex.
#[derive(Clone)]
pub struct AppState {
    /// Message classifier, loaded once at start-up.
    pub classifier: Arc<Mutex<MessageClassifier>>,
    /// Name of the toxicity model.
    pub toxicity_model: Arc<str>,
    /// Name of the sentiment model.
    pub sentiment_model: Arc<str>,
}

impl AppState {
    /// Creates application state around a loaded classifier.
    pub fn new(classifier: MessageClassifier) -> Self {
        let toxicity_model = Arc::from(classifier.toxicity_model());
        let sentiment_model = Arc::from(classifier.sentiment_model());
        Self {
            classifier: Arc::new(Mutex::new(classifier)),
            toxicity_model,
            sentiment_model,
        }
    }
}
