use crate::error::{AppError, Result};
use crate::ml::artifact::ModelArtifact;
use crate::ml::models::CreditPrediction;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Whether the service has a usable model
#[derive(Debug, Clone)]
pub enum ModelState {
    Ready(Arc<ModelArtifact>),

    /// Loading failed at startup; every prediction is refused
    Unavailable { reason: String },
}

/// Scores applicants with the artifact loaded at startup.
///
/// The state is decided once and never changes for the life of the process.
#[derive(Debug, Clone)]
pub struct PredictionService {
    state: ModelState,
}

impl PredictionService {
    /// Load the artifact at `path`. Failure is logged and leaves the service
    /// unavailable rather than aborting startup.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match ModelArtifact::load(path) {
            Ok(artifact) => {
                info!(
                    path = %path.display(),
                    model_id = %artifact.metadata.model_id,
                    trained_at = %artifact.metadata.trained_at,
                    features = artifact.transform.n_features(),
                    test_accuracy = artifact.metadata.test_metrics.accuracy,
                    "✅ Model loaded"
                );
                Self::ready(artifact)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load model artifact");
                warn!("Service will start without a model, /predict will return errors");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn ready(artifact: ModelArtifact) -> Self {
        Self {
            state: ModelState::Ready(Arc::new(artifact)),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    pub fn artifact(&self) -> Option<&Arc<ModelArtifact>> {
        match &self.state {
            ModelState::Ready(artifact) => Some(artifact),
            ModelState::Unavailable { .. } => None,
        }
    }

    /// Score one request body.
    ///
    /// Checks run in a fixed order: model availability, then body presence
    /// (`None` and falsy JSON such as `null`, `{}`, `[]`, `""`, `0` or
    /// `false` count as absent), then the applicant schema.
    pub fn predict(&self, body: Option<&Value>) -> Result<CreditPrediction> {
        let artifact = match &self.state {
            ModelState::Ready(artifact) => artifact,
            ModelState::Unavailable { reason } => {
                return Err(AppError::ModelUnavailable(reason.clone()))
            }
        };

        let body = body
            .filter(|value| !is_empty_body(value))
            .ok_or_else(|| AppError::BadRequest("request body is empty".to_string()))?;

        let prediction = artifact.predict_json(body)?;
        debug!(
            prediction = prediction.prediction,
            positive_probability = prediction.positive_probability,
            "Applicant scored"
        );
        Ok(prediction)
    }
}

fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let service = PredictionService::load("/nonexistent/model.bin");
        assert!(!service.is_ready());
        assert!(service.artifact().is_none());
        assert!(matches!(service.state(), ModelState::Unavailable { .. }));
    }

    #[test]
    fn test_unavailable_wins_over_missing_body() {
        let service = PredictionService::unavailable("no model");

        for body in [None, Some(json!({})), Some(json!({"umur": 30}))] {
            let err = service.predict(body.as_ref()).unwrap_err();
            assert!(matches!(err, AppError::ModelUnavailable(_)));
        }
    }

    #[test]
    fn test_empty_body_detection() {
        assert!(is_empty_body(&Value::Null));
        assert!(is_empty_body(&json!({})));
        assert!(is_empty_body(&json!([])));
        assert!(is_empty_body(&json!("")));
        assert!(is_empty_body(&json!(0)));
        assert!(is_empty_body(&json!(false)));
        assert!(!is_empty_body(&json!({"umur": 30})));
        assert!(!is_empty_body(&json!([1])));
        assert!(!is_empty_body(&json!("x")));
    }
}
