//! API route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{debug, error};

use crate::error::{ApiError, Result};
use crate::models::{ClassifyRequest, ClassifyResponse, HealthResponse};
use crate::state::AppState;

/// POST /classify - Classify a message and return its label.
pub async fn classify(
    State(state): State<AppState>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ClassifyResponse>> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if !body.is_object() {
        return Err(ApiError::BadRequest("expected a JSON object".to_string()));
    }
    let req: ClassifyRequest =
        serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    debug!(text_len = req.text().len(), "Classifying message");

    // Inference is CPU-bound; keep it off the async workers
    let classifier = state.classifier.clone();
    let classification = tokio::task::spawn_blocking(move || {
        let mut classifier = classifier
            .lock()
            .map_err(|_| ApiError::Internal("classifier lock poisoned".to_string()))?;
        classifier
            .classify_detailed(req.text())
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .inspect_err(|e| error!("Classification failed: {}", e))?;

    debug!(
        label = %classification.label,
        latency_us = classification.duration_us,
        "Classified message"
    );

    Ok(Json(classification.into()))
}

/// GET /health - Report loaded models.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        toxicity_model: state.toxicity_model.to_string(),
        sentiment_model: state.sentiment_model.to_string(),
    })
}
