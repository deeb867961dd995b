use crate::error::{AppError, Result};
use crate::ml::models::{
    decide, ClassWeights, EpochStats, ModelMetrics, TrainingHistory, TrainingParams,
};
use crate::ml::network::{Activation, FeedForwardNetwork};
use crate::ml::optimizer::{Adam, AdamConfig};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Predictions are clipped to `[EPSILON, 1 - EPSILON]` inside the loss
pub const LOSS_EPSILON: f64 = 1e-7;

const HIDDEN_UNITS: [usize; 2] = [64, 32];
const DROPOUT_RATE: f64 = 0.3;

/// Binary cross-entropy of one prediction
pub fn binary_cross_entropy(probability: f64, label: u8) -> f64 {
    let p = probability.clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
    if label == 1 {
        -p.ln()
    } else {
        -(1.0 - p).ln()
    }
}

/// Feed-forward binary classifier over transformed applicant features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditClassifier {
    network: FeedForwardNetwork,

    /// Weights used during the last `fit`
    class_weights: Option<ClassWeights>,

    trained: bool,
}

impl CreditClassifier {
    /// Untrained classifier with the standard architecture:
    /// `Dense(64, relu) -> Dropout(0.3) -> Dense(32, relu) -> Dense(1, sigmoid)`
    pub fn new(input_dim: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let network = FeedForwardNetwork::builder(input_dim)
            .dense(HIDDEN_UNITS[0], Activation::Relu)
            .dropout(DROPOUT_RATE)
            .dense(HIDDEN_UNITS[1], Activation::Relu)
            .dense(1, Activation::Sigmoid)
            .build(&mut rng)?;

        Ok(Self {
            network,
            class_weights: None,
            trained: false,
        })
    }

    /// Wrap an existing network, treated as trained
    pub fn from_network(network: FeedForwardNetwork) -> Result<Self> {
        let classifier = Self {
            network,
            class_weights: None,
            trained: true,
        };
        classifier.check_output_contract()?;
        Ok(classifier)
    }

    pub fn network(&self) -> &FeedForwardNetwork {
        &self.network
    }

    pub fn class_weights(&self) -> Option<&ClassWeights> {
        self.class_weights.as_ref()
    }

    pub fn input_dim(&self) -> usize {
        self.network.input_dim()
    }

    pub fn output_dim(&self) -> usize {
        self.network.output_dim()
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Train with class-weighted binary cross-entropy and Adam.
    ///
    /// Rows are reshuffled every epoch from an RNG seeded with
    /// `params.seed`, so two runs with the same inputs produce identical
    /// weights.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[u8],
        params: &TrainingParams,
    ) -> Result<TrainingHistory> {
        if x.nrows() != y.len() {
            return Err(AppError::Processing(format!(
                "feature matrix has {} rows but {} labels were given",
                x.nrows(),
                y.len()
            )));
        }
        if params.batch_size == 0 || params.epochs == 0 {
            return Err(AppError::Processing(
                "epochs and batch size must be positive".to_string(),
            ));
        }

        let class_weights = ClassWeights::balanced(y)?;
        info!(
            samples = y.len(),
            features = x.ncols(),
            weight_negative = class_weights.negative,
            weight_positive = class_weights.positive,
            "Training classifier"
        );

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut adam = Adam::new(
            AdamConfig::default().with_learning_rate(params.learning_rate),
            &self.network,
        );

        let mut order: Vec<usize> = (0..y.len()).collect();
        let mut history = TrainingHistory::default();

        for epoch in 1..=params.epochs {
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            let mut correct = 0usize;

            for batch in order.chunks(params.batch_size) {
                let xb = x.select(Axis(0), batch);
                let labels: Vec<u8> = batch.iter().map(|&i| y[i]).collect();
                let weights: Vec<f64> = labels.iter().map(|&l| class_weights.weight(l)).collect();

                let pass = self.network.forward_train(&xb, &mut rng)?;
                let probabilities = pass.output.column(0);

                let n = batch.len() as f64;
                let mut delta = Array2::zeros((batch.len(), 1));
                for (i, (&p, (&label, &w))) in probabilities
                    .iter()
                    .zip(labels.iter().zip(&weights))
                    .enumerate()
                {
                    loss_sum += w * binary_cross_entropy(p, label);
                    if decide(p) == label {
                        correct += 1;
                    }
                    delta[[i, 0]] = w * (p - f64::from(label)) / n;
                }

                let gradients = self.network.backward(&pass, delta)?;
                adam.step(&mut self.network, &gradients)?;
            }

            let stats = EpochStats {
                epoch,
                loss: loss_sum / y.len() as f64,
                accuracy: correct as f64 / y.len() as f64,
            };
            debug!(
                epoch = stats.epoch,
                loss = stats.loss,
                accuracy = stats.accuracy,
                "Epoch finished"
            );
            history.epochs.push(stats);
        }

        if let Some(last) = history.last() {
            info!(
                epochs = params.epochs,
                loss = last.loss,
                accuracy = last.accuracy,
                "✅ Classifier trained"
            );
        }

        self.class_weights = Some(class_weights);
        self.trained = true;
        Ok(history)
    }

    /// Positive-class probability for every row, dropout disabled
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_output_contract()?;
        let output = self.network.predict(x)?;
        Ok(output.column(0).to_owned())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>> {
        Ok(self.predict_proba(x)?.iter().map(|&p| decide(p)).collect())
    }

    /// Unweighted loss and classification metrics on a labelled set
    pub fn evaluate(&self, x: &Array2<f64>, y: &[u8]) -> Result<ModelMetrics> {
        if x.nrows() != y.len() {
            return Err(AppError::Processing(format!(
                "feature matrix has {} rows but {} labels were given",
                x.nrows(),
                y.len()
            )));
        }

        let probabilities = self.predict_proba(x)?;
        let loss = mean_loss(probabilities.view(), y);
        let predicted: Vec<u8> = probabilities.iter().map(|&p| decide(p)).collect();

        Ok(ModelMetrics::from_predictions(y, &predicted, loss))
    }

    fn check_output_contract(&self) -> Result<()> {
        if self.network.output_dim() != 1 {
            return Err(AppError::Processing(format!(
                "classifier must emit exactly one probability per row, network emits {}",
                self.network.output_dim()
            )));
        }
        Ok(())
    }
}

fn mean_loss(probabilities: ArrayView1<f64>, y: &[u8]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    probabilities
        .iter()
        .zip(y)
        .map(|(&p, &label)| binary_cross_entropy(p, label))
        .sum::<f64>()
        / y.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::network::{Dense, Layer};
    use ndarray::array;
    use rand::Rng;

    /// Two informative features: label is 1 when x0 + x1 > 0
    fn separable(n: usize, seed: u64) -> (Array2<f64>, Vec<u8>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Array2::zeros((n, 2));
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a: f64 = rng.gen_range(-2.0..2.0);
            let b: f64 = rng.gen_range(-2.0..2.0);
            x[[i, 0]] = a;
            x[[i, 1]] = b;
            y.push(u8::from(a + b > 0.0));
        }
        (x, y)
    }

    fn fast_params() -> TrainingParams {
        TrainingParams {
            epochs: 40,
            batch_size: 16,
            learning_rate: 0.01,
            seed: 42,
        }
    }

    #[test]
    fn test_binary_cross_entropy_is_clipped() {
        assert!(binary_cross_entropy(0.0, 1).is_finite());
        assert!(binary_cross_entropy(1.0, 0).is_finite());
        assert!((binary_cross_entropy(0.5, 1) - 2f64.ln()).abs() < 1e-12);
        assert!(binary_cross_entropy(0.99, 1) < binary_cross_entropy(0.6, 1));
    }

    #[test]
    fn test_new_has_standard_architecture() {
        let classifier = CreditClassifier::new(13, 42).unwrap();
        assert_eq!(classifier.input_dim(), 13);
        assert_eq!(classifier.output_dim(), 1);
        assert_eq!(classifier.network().layers().len(), 4);
        assert!(matches!(
            classifier.network().layers()[1],
            Layer::Dropout { rate } if rate == 0.3
        ));
        assert!(!classifier.is_trained());
    }

    #[test]
    fn test_fit_learns_separable_data() {
        let (x, y) = separable(256, 1);
        let mut classifier = CreditClassifier::new(2, 42).unwrap();

        let history = classifier.fit(&x, &y, &fast_params()).unwrap();
        assert_eq!(history.epochs.len(), 40);
        assert!(history.epochs[39].loss < history.epochs[0].loss);
        assert!(classifier.is_trained());

        let (x_test, y_test) = separable(128, 2);
        let metrics = classifier.evaluate(&x_test, &y_test).unwrap();
        assert!(metrics.accuracy > 0.9, "accuracy was {}", metrics.accuracy);
        assert_eq!(metrics.support, 128);
    }

    #[test]
    fn test_fit_is_reproducible_with_seed() {
        let (x, y) = separable(64, 3);
        let params = TrainingParams {
            epochs: 3,
            ..fast_params()
        };

        let mut first = CreditClassifier::new(2, 7).unwrap();
        let mut second = CreditClassifier::new(2, 7).unwrap();
        first.fit(&x, &y, &params).unwrap();
        second.fit(&x, &y, &params).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let (x, y) = separable(10, 4);
        let mut classifier = CreditClassifier::new(2, 42).unwrap();

        assert!(classifier.fit(&x, &y[..5], &fast_params()).is_err());
        assert!(classifier.fit(&x, &[1; 10], &fast_params()).is_err());

        let no_batches = TrainingParams {
            batch_size: 0,
            ..fast_params()
        };
        assert!(classifier.fit(&x, &y, &no_batches).is_err());
    }

    #[test]
    fn test_predict_proba_one_value_per_row() {
        let classifier = CreditClassifier::new(3, 42).unwrap();
        let x = array![[0.1, 0.2, 0.3], [1.0, -1.0, 0.0], [0.0, 0.0, 0.0]];

        let probabilities = classifier.predict_proba(&x).unwrap();
        assert_eq!(probabilities.len(), 3);
        assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(classifier.predict_proba(&x).unwrap(), probabilities);
    }

    #[test]
    fn test_multi_output_network_is_rejected() {
        let network = FeedForwardNetwork::from_layers(vec![Layer::Dense(Dense {
            weights: Array2::zeros((2, 2)),
            bias: Array1::zeros(2),
            activation: Activation::Sigmoid,
        })])
        .unwrap();
        assert!(CreditClassifier::from_network(network).is_err());
    }
}
