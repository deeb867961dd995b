use crate::error::{AppError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Element-wise activation of a dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv(sigmoid),
        }
    }

    /// d(activation)/dz evaluated at z
    fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => z.mapv(|v| {
                let s = sigmoid(v);
                s * (1.0 - s)
            }),
        }
    }
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fully connected layer, `weights` is (inputs × units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub activation: Activation,
}

impl Dense {
    /// Glorot-uniform weights, zero bias
    pub fn glorot<R: Rng + ?Sized>(
        inputs: usize,
        units: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (inputs + units) as f64).sqrt();
        let weights = Array2::from_shape_fn((inputs, units), |_| rng.gen_range(-limit..limit));

        Self {
            weights,
            bias: Array1::zeros(units),
            activation,
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn units(&self) -> usize {
        self.weights.ncols()
    }

    fn pre_activation(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Layer {
    Dense(Dense),

    /// Inverted dropout, identity outside training
    Dropout { rate: f64 },
}

/// Per-layer values kept from a training forward pass
#[derive(Debug)]
enum LayerCache {
    Dense { input: Array2<f64>, z: Array2<f64> },
    Dropout { mask: Array2<f64> },
}

/// Result of a training-mode forward pass
#[derive(Debug)]
pub struct ForwardPass {
    caches: Vec<LayerCache>,
    pub output: Array2<f64>,
}

/// Gradient of the loss w.r.t. one dense layer's parameters
#[derive(Debug, Clone)]
pub struct DenseGradient {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Every dense layer's bias matches its units and its inputs match the
/// previous dense layer's units. Dropout rates lie in [0, 1).
fn check_layers(layers: &[Layer]) -> Result<()> {
    let mut width: Option<usize> = None;
    for (idx, layer) in layers.iter().enumerate() {
        match layer {
            Layer::Dense(dense) => {
                if dense.bias.len() != dense.units() {
                    return Err(AppError::Artifact(format!(
                        "layer {idx}: bias length {} does not match {} units",
                        dense.bias.len(),
                        dense.units()
                    )));
                }
                if dense.units() == 0 || dense.inputs() == 0 {
                    return Err(AppError::Artifact(format!(
                        "layer {idx}: empty weight matrix {:?}",
                        dense.weights.shape()
                    )));
                }
                if let Some(w) = width {
                    if w != dense.inputs() {
                        return Err(AppError::Artifact(format!(
                            "layer {idx}: expects {} inputs but previous layer emits {}",
                            dense.inputs(),
                            w
                        )));
                    }
                }
                width = Some(dense.units());
            }
            Layer::Dropout { rate } => {
                if !(0.0..1.0).contains(rate) {
                    return Err(AppError::Artifact(format!(
                        "layer {idx}: invalid dropout rate {rate}"
                    )));
                }
            }
        }
    }
    if width.is_none() {
        return Err(AppError::Artifact(
            "network needs at least one dense layer".to_string(),
        ));
    }
    Ok(())
}

/// Sequential feed-forward network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardNetwork {
    layers: Vec<Layer>,
}

impl FeedForwardNetwork {
    pub fn builder(input_dim: usize) -> NetworkBuilder {
        NetworkBuilder {
            input_dim,
            specs: Vec::new(),
        }
    }

    /// Assemble a network from explicit layers, checking that dimensions chain
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self> {
        check_layers(&layers)?;
        Ok(Self { layers })
    }

    /// Re-run the `from_layers` checks. Deserialized networks skip the
    /// constructor, so anything read from disk goes through here.
    pub fn check(&self) -> Result<()> {
        check_layers(&self.layers)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn dense_layers(&self) -> impl Iterator<Item = &Dense> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense),
            Layer::Dropout { .. } => None,
        })
    }

    pub(crate) fn dense_layers_mut(&mut self) -> impl Iterator<Item = &mut Dense> {
        self.layers.iter_mut().filter_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense),
            Layer::Dropout { .. } => None,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.dense_layers().next().map(Dense::inputs).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.dense_layers().last().map(Dense::units).unwrap_or(0)
    }

    pub fn output_activation(&self) -> Option<Activation> {
        self.dense_layers().last().map(|d| d.activation)
    }

    pub fn n_parameters(&self) -> usize {
        self.dense_layers()
            .map(|d| d.weights.len() + d.bias.len())
            .sum()
    }

    /// Inference-mode forward pass: dropout disabled, deterministic
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;

        let mut activations = x.to_owned();
        for layer in &self.layers {
            if let Layer::Dense(dense) = layer {
                activations = dense.activation.apply(&dense.pre_activation(&activations));
            }
        }
        Ok(activations)
    }

    /// Training-mode forward pass: samples dropout masks and keeps what
    /// `backward` needs
    pub fn forward_train<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        rng: &mut R,
    ) -> Result<ForwardPass> {
        self.check_input(x)?;

        let mut caches = Vec::with_capacity(self.layers.len());
        let mut activations = x.to_owned();

        for layer in &self.layers {
            match layer {
                Layer::Dense(dense) => {
                    let z = dense.pre_activation(&activations);
                    let next = dense.activation.apply(&z);
                    caches.push(LayerCache::Dense {
                        input: activations,
                        z,
                    });
                    activations = next;
                }
                Layer::Dropout { rate } => {
                    let keep = 1.0 - rate;
                    let mask = Array2::from_shape_fn(activations.raw_dim(), |_| {
                        if rng.gen::<f64>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    });
                    activations = &activations * &mask;
                    caches.push(LayerCache::Dropout { mask });
                }
            }
        }

        Ok(ForwardPass {
            caches,
            output: activations,
        })
    }

    /// Backpropagate through a training pass.
    ///
    /// `output_delta` is dLoss/dz of the final dense layer (its pre-activation),
    /// shape (batch × output_dim). Gradients are returned in dense-layer order.
    pub fn backward(&self, pass: &ForwardPass, output_delta: Array2<f64>) -> Result<Vec<DenseGradient>> {
        if output_delta.dim() != pass.output.dim() {
            return Err(AppError::Processing(format!(
                "output delta shape {:?} does not match output shape {:?}",
                output_delta.dim(),
                pass.output.dim()
            )));
        }

        let mut gradients = Vec::new();
        let mut grad = output_delta;
        let mut at_output = true;

        for (layer, cache) in self.layers.iter().zip(&pass.caches).rev() {
            match (layer, cache) {
                (Layer::Dense(dense), LayerCache::Dense { input, z }) => {
                    let dz = if at_output {
                        grad
                    } else {
                        grad * dense.activation.derivative(z)
                    };
                    at_output = false;

                    gradients.push(DenseGradient {
                        weights: input.t().dot(&dz),
                        bias: dz.sum_axis(Axis(0)),
                    });
                    grad = dz.dot(&dense.weights.t());
                }
                (Layer::Dropout { .. }, LayerCache::Dropout { mask }) => {
                    grad = grad * mask;
                }
                _ => {
                    return Err(AppError::Processing(
                        "forward pass does not belong to this network".to_string(),
                    ))
                }
            }
        }

        gradients.reverse();
        Ok(gradients)
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.input_dim() {
            return Err(AppError::Processing(format!(
                "network expects {} features, got {}",
                self.input_dim(),
                x.ncols()
            )));
        }
        Ok(())
    }
}

enum LayerSpec {
    Dense { units: usize, activation: Activation },
    Dropout { rate: f64 },
}

/// Declarative network construction; weights are drawn in `build`
pub struct NetworkBuilder {
    input_dim: usize,
    specs: Vec<LayerSpec>,
}

impl NetworkBuilder {
    pub fn dense(mut self, units: usize, activation: Activation) -> Self {
        self.specs.push(LayerSpec::Dense { units, activation });
        self
    }

    pub fn dropout(mut self, rate: f64) -> Self {
        self.specs.push(LayerSpec::Dropout { rate });
        self
    }

    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Result<FeedForwardNetwork> {
        if self.input_dim == 0 {
            return Err(AppError::Processing(
                "network input dimension must be positive".to_string(),
            ));
        }

        let mut inputs = self.input_dim;
        let layers = self
            .specs
            .into_iter()
            .map(|spec| match spec {
                LayerSpec::Dense { units, activation } => {
                    let dense = Dense::glorot(inputs, units, activation, &mut *rng);
                    inputs = units;
                    Layer::Dense(dense)
                }
                LayerSpec::Dropout { rate } => Layer::Dropout { rate },
            })
            .collect();

        FeedForwardNetwork::from_layers(layers)
    }
}
