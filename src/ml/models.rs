use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Fixed decision boundary on the positive-class probability
pub const DECISION_THRESHOLD: f64 = 0.5;

pub const STATUS_CREDITWORTHY: &str = "Layak Kredit";
pub const STATUS_NOT_CREDITWORTHY: &str = "Tidak Layak Kredit";

/// Prediction returned for one applicant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPrediction {
    /// 1 = creditworthy, 0 = not creditworthy
    pub prediction: u8,

    /// Human-readable decision
    pub status_text: String,

    /// Probability of the creditworthy class (0.0 - 1.0)
    pub positive_probability: f64,
}

impl CreditPrediction {
    pub fn from_probability(positive_probability: f64) -> Self {
        let prediction = decide(positive_probability);
        let status_text = if prediction == 1 {
            STATUS_CREDITWORTHY
        } else {
            STATUS_NOT_CREDITWORTHY
        };

        Self {
            prediction,
            status_text: status_text.to_string(),
            positive_probability,
        }
    }
}

/// Apply the decision threshold: positive iff probability >= 0.5
pub fn decide(positive_probability: f64) -> u8 {
    u8::from(positive_probability >= DECISION_THRESHOLD)
}

/// Loss weights that balance the two classes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    pub negative: f64,
    pub positive: f64,
}

impl ClassWeights {
    /// `n_samples / (n_classes * count_c)` for each class
    pub fn balanced(labels: &[u8]) -> Result<Self> {
        let positives = labels.iter().filter(|&&l| l == 1).count();
        let negatives = labels.len() - positives;

        if positives == 0 || negatives == 0 {
            return Err(AppError::Dataset(format!(
                "both classes are required for training (positive: {positives}, negative: {negatives})"
            )));
        }

        let n = labels.len() as f64;
        Ok(Self {
            negative: n / (2.0 * negatives as f64),
            positive: n / (2.0 * positives as f64),
        })
    }

    /// Unit weight for both classes
    pub fn uniform() -> Self {
        Self {
            negative: 1.0,
            positive: 1.0,
        }
    }

    pub fn weight(&self, label: u8) -> f64 {
        if label == 1 {
            self.positive
        } else {
            self.negative
        }
    }
}

/// Parameters of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

impl From<&crate::config::TrainingConfig> for TrainingParams {
    fn from(config: &crate::config::TrainingConfig) -> Self {
        Self {
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            seed: config.seed,
        }
    }
}

/// Training-split statistics of one epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,

    /// Class-weighted binary cross-entropy
    pub loss: f64,

    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochStats>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }
}

/// Binary confusion counts, positive = creditworthy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

/// Model evaluation metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Unweighted binary cross-entropy
    pub loss: f64,

    pub accuracy: f64,

    /// Precision of the positive class
    pub precision: f64,

    /// Recall of the positive class
    pub recall: f64,

    pub f1_score: f64,

    pub confusion_matrix: ConfusionMatrix,

    pub support: usize,
}

impl ModelMetrics {
    pub fn from_predictions(y_true: &[u8], y_pred: &[u8], loss: f64) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (1, 1) => cm.true_positive += 1,
                (0, 1) => cm.false_positive += 1,
                (1, _) => cm.false_negative += 1,
                _ => cm.true_negative += 1,
            }
        }

        let support = y_true.len();
        if support == 0 {
            return Self::default();
        }

        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        let accuracy = ratio(cm.true_positive + cm.true_negative, support);
        let precision = ratio(cm.true_positive, cm.true_positive + cm.false_positive);
        let recall = ratio(cm.true_positive, cm.true_positive + cm.false_negative);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            loss,
            accuracy,
            precision,
            recall,
            f1_score,
            confusion_matrix: cm,
            support,
        }
    }
}

/// Model metadata stored alongside the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: Uuid,

    pub name: String,

    /// Crate version that produced the artifact
    pub version: String,

    pub trained_at: chrono::DateTime<chrono::Utc>,

    pub n_training_samples: usize,

    pub n_test_samples: usize,

    pub n_features: usize,

    pub feature_names: Vec<String>,

    pub class_weights: ClassWeights,

    pub test_metrics: ModelMetrics,

    pub hyperparameters: HashMap<String, String>,
}

impl ModelMetadata {
    /// Fresh metadata for a model over the given feature layout
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            model_id: Uuid::new_v4(),
            name: "credit-scoring-mlp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            n_training_samples: 0,
            n_test_samples: 0,
            n_features: feature_names.len(),
            feature_names,
            class_weights: ClassWeights::uniform(),
            test_metrics: ModelMetrics::default(),
            hyperparameters: HashMap::new(),
        }
    }

    pub fn with_hyperparameter(mut self, key: &str, value: impl ToString) -> Self {
        self.hyperparameters.insert(key.to_string(), value.to_string());
        self
    }
}
