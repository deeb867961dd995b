use crate::api::AppState;
use crate::error::Result;
use crate::ml::CreditPrediction;
use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.service.is_ready();
    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
}

/// Score one applicant.
///
/// The raw body is read so that an empty or malformed payload reaches the
/// service as "no data" instead of being rejected by an extractor before the
/// model availability check runs.
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreditPrediction>> {
    let payload = parse_body(&body);
    let prediction = state.service.predict(payload.as_ref())?;
    Ok(Json(prediction))
}

fn parse_body(body: &[u8]) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "Request body is not valid JSON");
            None
        }
    }
}
