/// Machine learning pipeline for credit-worthiness classification
///
/// This module provides:
/// - Column-wise preprocessing of applicant records
/// - A feed-forward network with Adam training
/// - Loading and splitting of historical applicant data
/// - The persisted model artifact and the prediction service built on it

pub mod artifact;
pub mod classifier;
pub mod dataset;
pub mod features;
pub mod models;
pub mod network;
pub mod optimizer;
pub mod service;
pub mod training;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use classifier::CreditClassifier;
pub use dataset::TrainingDataset;
pub use features::{ColumnTransformer, OneHotEncoder, StandardScaler};
pub use models::{
    ClassWeights, CreditPrediction, ModelMetadata, ModelMetrics, TrainingHistory,
    TrainingParams, DECISION_THRESHOLD,
};
pub use network::{Activation, FeedForwardNetwork};
pub use service::{ModelState, PredictionService};
pub use training::{run_training, train_on_dataset, TrainingReport};
