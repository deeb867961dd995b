use crate::error::{AppError, Result};
use crate::ml::classifier::CreditClassifier;
use crate::ml::features::ColumnTransformer;
use crate::ml::models::{CreditPrediction, ModelMetadata};
use crate::models::ApplicantRecord;
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Bumped whenever the persisted layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Everything needed to serve predictions: the fitted transform, the trained
/// classifier and a description of how they were produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub metadata: ModelMetadata,
    pub transform: ColumnTransformer,
    pub classifier: CreditClassifier,
}

impl ModelArtifact {
    pub fn new(
        metadata: ModelMetadata,
        transform: ColumnTransformer,
        classifier: CreditClassifier,
    ) -> Result<Self> {
        let artifact = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata,
            transform,
            classifier,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check that the transform and classifier fit together
    pub fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(AppError::Artifact(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        self.classifier.network().check()?;
        if !self.transform.is_fitted() {
            return Err(AppError::Artifact("transform is not fitted".to_string()));
        }
        if self.transform.n_features() != self.classifier.input_dim() {
            return Err(AppError::Artifact(format!(
                "transform emits {} features but classifier expects {}",
                self.transform.n_features(),
                self.classifier.input_dim()
            )));
        }
        if self.classifier.output_dim() != 1 {
            return Err(AppError::Artifact(format!(
                "classifier must have exactly one output, has {}",
                self.classifier.output_dim()
            )));
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;

        info!(
            path = %path.display(),
            model_id = %self.metadata.model_id,
            features = self.transform.n_features(),
            "💾 Model artifact saved"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let artifact: Self = bincode::deserialize(&bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Passthrough columns a request must carry besides the ten applicant fields
    pub fn passthrough_columns(&self) -> &[String] {
        self.transform.passthrough_columns()
    }

    pub fn predict(&self, record: &ApplicantRecord) -> Result<CreditPrediction> {
        let features = self.transform.transform_one(record)?.insert_axis(Axis(0));
        let probabilities = self.classifier.predict_proba(&features)?;

        let probability = match probabilities.as_slice() {
            Some([p]) => *p,
            _ => {
                return Err(AppError::Processing(format!(
                    "expected one probability, got {}",
                    probabilities.len()
                )))
            }
        };
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(AppError::Processing(format!(
                "classifier produced an invalid probability: {probability}"
            )));
        }

        Ok(CreditPrediction::from_probability(probability))
    }

    /// Schema-check a JSON object and predict on it
    pub fn predict_json(&self, value: &Value) -> Result<CreditPrediction> {
        let record = ApplicantRecord::from_json(value, self.passthrough_columns())?;
        self.predict(&record)
    }
}
