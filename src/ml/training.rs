use crate::config::TrainingConfig;
use crate::error::{AppError, Result};
use crate::ml::artifact::ModelArtifact;
use crate::ml::classifier::CreditClassifier;
use crate::ml::dataset::TrainingDataset;
use crate::ml::features::ColumnTransformer;
use crate::ml::models::{ModelMetadata, TrainingHistory, TrainingParams};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use validator::Validate;

/// Outcome of one training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub artifact_path: PathBuf,
    pub metadata: ModelMetadata,
    pub history: TrainingHistory,
}

/// Load the data file named in `config`, train, evaluate and write the
/// artifact to `output_path`.
pub fn run_training(config: &TrainingConfig, output_path: impl AsRef<Path>) -> Result<TrainingReport> {
    config.validate()?;

    let dataset = TrainingDataset::load_csv(&config.data_path, config.delimiter)?;
    let (artifact, history) = train_on_dataset(&dataset, config)?;

    let output_path = output_path.as_ref();
    artifact.save(output_path)?;

    Ok(TrainingReport {
        artifact_path: output_path.to_path_buf(),
        metadata: artifact.metadata,
        history,
    })
}

/// Split, fit the transform on the train rows only, train the classifier and
/// evaluate it on the held-out rows.
pub fn train_on_dataset(
    dataset: &TrainingDataset,
    config: &TrainingConfig,
) -> Result<(ModelArtifact, TrainingHistory)> {
    let (train, test) = dataset.stratified_split(config.test_size, config.seed)?;
    info!(
        train_rows = train.len(),
        test_rows = test.len(),
        test_size = config.test_size,
        "Split dataset"
    );

    let mut transform = ColumnTransformer::new();
    let x_train = transform.fit_transform(&train.records)?;
    let x_test = transform.transform(&test.records)?;
    info!(features = transform.n_features(), "Fitted column transform");

    let params = TrainingParams::from(config);
    let mut classifier = CreditClassifier::new(transform.n_features(), params.seed)?;
    let history = classifier.fit(&x_train, &train.labels, &params)?;

    let test_metrics = classifier.evaluate(&x_test, &test.labels)?;
    info!(
        loss = test_metrics.loss,
        accuracy = test_metrics.accuracy,
        precision = test_metrics.precision,
        recall = test_metrics.recall,
        f1 = test_metrics.f1_score,
        "📊 Test split evaluation"
    );

    let class_weights = classifier.class_weights().copied().ok_or_else(|| {
        AppError::Processing("classifier finished training without class weights".to_string())
    })?;

    let mut metadata = ModelMetadata::new(transform.feature_names())
        .with_hyperparameter("epochs", params.epochs)
        .with_hyperparameter("batch_size", params.batch_size)
        .with_hyperparameter("learning_rate", params.learning_rate)
        .with_hyperparameter("seed", params.seed)
        .with_hyperparameter("test_size", config.test_size)
        .with_hyperparameter("optimizer", "adam")
        .with_hyperparameter("architecture", "dense64_relu-dropout0.3-dense32_relu-dense1_sigmoid");
    metadata.n_training_samples = train.len();
    metadata.n_test_samples = test.len();
    metadata.class_weights = class_weights;
    metadata.test_metrics = test_metrics;

    let artifact = ModelArtifact::new(metadata, transform, classifier)?;
    Ok((artifact, history))
}
