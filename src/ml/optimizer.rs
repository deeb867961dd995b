use crate::error::{AppError, Result};
use crate::ml::network::{DenseGradient, FeedForwardNetwork};
use ndarray::{Array, Array1, Array2, Dimension, Zip};
use serde::{Deserialize, Serialize};

/// Adam hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

impl AdamConfig {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }
}

/// First and second moment estimates for one dense layer
#[derive(Debug, Clone)]
struct LayerMoments {
    m_weights: Array2<f64>,
    v_weights: Array2<f64>,
    m_bias: Array1<f64>,
    v_bias: Array1<f64>,
}

/// Adam optimizer bound to the parameter shapes of one network
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    beta1_t: f64,
    beta2_t: f64,
    moments: Vec<LayerMoments>,
}

impl Adam {
    /// Creates an `Adam` instance with zeroed moments shaped like `network`'s
    /// dense layers.
    pub fn new(config: AdamConfig, network: &FeedForwardNetwork) -> Self {
        let moments = network
            .dense_layers()
            .map(|dense| LayerMoments {
                m_weights: Array2::zeros(dense.weights.raw_dim()),
                v_weights: Array2::zeros(dense.weights.raw_dim()),
                m_bias: Array1::zeros(dense.bias.raw_dim()),
                v_bias: Array1::zeros(dense.bias.raw_dim()),
            })
            .collect();

        Self {
            config,
            beta1_t: 1.0,
            beta2_t: 1.0,
            moments,
        }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Apply one update with gradients in dense-layer order
    pub fn step(
        &mut self,
        network: &mut FeedForwardNetwork,
        gradients: &[DenseGradient],
    ) -> Result<()> {
        if gradients.len() != self.moments.len() {
            return Err(AppError::Processing(format!(
                "expected {} layer gradients, got {}",
                self.moments.len(),
                gradients.len()
            )));
        }

        for ((dense, grad), moments) in network
            .dense_layers()
            .zip(gradients)
            .zip(&self.moments)
        {
            check_shape(dense.weights.shape(), grad.weights.shape())?;
            check_shape(dense.bias.shape(), grad.bias.shape())?;
            check_shape(dense.weights.shape(), moments.m_weights.shape())?;
            check_shape(dense.bias.shape(), moments.m_bias.shape())?;
        }

        let AdamConfig {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
        } = self.config;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1.0 - self.beta1_t;
        let bc2 = 1.0 - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);
        let hyper = (b1, b2, eps, step_size);

        for ((dense, grad), moments) in network
            .dense_layers_mut()
            .zip(gradients)
            .zip(self.moments.iter_mut())
        {
            update(
                &mut dense.weights,
                &grad.weights,
                &mut moments.m_weights,
                &mut moments.v_weights,
                hyper,
            );
            update(
                &mut dense.bias,
                &grad.bias,
                &mut moments.m_bias,
                &mut moments.v_bias,
                hyper,
            );
        }

        Ok(())
    }
}

fn check_shape(params: &[usize], grad: &[usize]) -> Result<()> {
    if params != grad {
        return Err(AppError::Processing(format!(
            "gradient shape {grad:?} does not match parameter shape {params:?}"
        )));
    }
    Ok(())
}

/// Shapes are checked by the caller
fn update<D: Dimension>(
    params: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    (b1, b2, eps, step_size): (f64, f64, f64, f64),
) {
    Zip::from(params)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            *p -= step_size * *m / (v.sqrt() + eps);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::network::{Activation, Dense, Layer};
    use ndarray::array;

    fn single_layer() -> FeedForwardNetwork {
        FeedForwardNetwork::from_layers(vec![Layer::Dense(Dense {
            weights: array![[1.0], [-1.0]],
            bias: array![0.5],
            activation: Activation::Sigmoid,
        })])
        .unwrap()
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut network = single_layer();
        let mut adam = Adam::new(AdamConfig::default(), &network);

        let gradients = vec![DenseGradient {
            weights: array![[0.2], [-3.0]],
            bias: array![0.0],
        }];
        adam.step(&mut network, &gradients).unwrap();

        // Bias-corrected first step is ~lr * sign(g)
        let Layer::Dense(dense) = &network.layers()[0] else {
            panic!("expected dense layer");
        };
        assert!((dense.weights[[0, 0]] - (1.0 - 0.001)).abs() < 1e-6);
        assert!((dense.weights[[1, 0]] - (-1.0 + 0.001)).abs() < 1e-6);
        assert_eq!(dense.bias[0], 0.5);
    }

    #[test]
    fn test_step_rejects_mismatched_gradients() {
        let mut network = single_layer();
        let mut adam = Adam::new(AdamConfig::default(), &network);

        assert!(adam.step(&mut network, &[]).is_err());

        let wrong_shape = vec![DenseGradient {
            weights: Array2::zeros((3, 1)),
            bias: Array1::zeros(1),
        }];
        assert!(adam.step(&mut network, &wrong_shape).is_err());
    }

    #[test]
    fn test_rejected_step_leaves_network_untouched() {
        let mut network = single_layer();
        let before = network.clone();
        let mut adam = Adam::new(AdamConfig::default(), &network);

        let bad_bias = vec![DenseGradient {
            weights: array![[0.2], [-3.0]],
            bias: Array1::zeros(2),
        }];
        assert!(adam.step(&mut network, &bad_bias).is_err());
        assert_eq!(network, before);

        // Moments and bias correction were not advanced either
        let good = vec![DenseGradient {
            weights: array![[0.2], [-3.0]],
            bias: array![0.0],
        }];
        adam.step(&mut network, &good).unwrap();
        let Layer::Dense(dense) = &network.layers()[0] else {
            panic!("expected dense layer");
        };
        assert!((dense.weights[[0, 0]] - (1.0 - 0.001)).abs() < 1e-6);
    }

    #[test]
    fn test_learning_rate_override() {
        let config = AdamConfig::default().with_learning_rate(0.01);
        assert_eq!(config.learning_rate, 0.01);
        assert_eq!(config.epsilon, 1e-7);
    }
}
