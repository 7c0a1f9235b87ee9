use ndarray::{Array, Array1, Array2, ArrayView2, ArrayViewD, ArrayViewMutD, Dimension, Zip};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

mod dense;
mod lstm;
mod optimizer;

pub use dense::*;
pub use lstm::*;
pub use optimizer::*;

use lstm::LstmCache;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    /// Widths of the hidden dense layers between the encoder and the scalar output.
    pub head_sizes: Vec<usize>,
    /// Dropout rate between recurrent layers and after each hidden dense layer.
    pub dropout: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_size: crate::FEATURES,
            hidden_size: 64,
            num_layers: 2,
            head_sizes: vec![32, 16],
            dropout: 0.2,
        }
    }
}

/// Recurrent regressor mapping a feature sequence to a single log-count.
///
/// A stack of LSTM layers encodes the sequence, the final hidden state of the last layer is fed
/// through a ReLU dense head ending in one output unit. Every call starts from zero recurrent
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastNetwork {
    config: ModelConfig,
    pub(crate) encoder: Vec<LstmLayer>,
    pub(crate) head: Vec<DenseLayer>,
}

/// Intermediate values of a forward pass needed by [`ForecastNetwork::backward`].
pub(crate) struct ForwardPass {
    encoder: Vec<LstmCache>,
    encoder_masks: Vec<Option<Array2<f64>>>,
    head_inputs: Vec<Array1<f64>>,
    head_activations: Vec<(Array1<f64>, Option<Array1<f64>>)>,
    output: f64,
}

impl ForwardPass {
    pub(crate) fn output(&self) -> f64 {
        self.output
    }
}

impl ForecastNetwork {
    pub fn new(config: ModelConfig, rng: &mut StdRng) -> Self {
        let mut encoder = Vec::with_capacity(config.num_layers);
        let mut width = config.input_size;
        for _ in 0..config.num_layers {
            encoder.push(LstmLayer::new(width, config.hidden_size, rng));
            width = config.hidden_size;
        }

        let mut head = Vec::with_capacity(config.head_sizes.len() + 1);
        for &size in config.head_sizes.iter().chain(std::iter::once(&1)) {
            head.push(DenseLayer::new(width, size, rng));
            width = size;
        }

        Self {
            config,
            encoder,
            head,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Predicted log-count for a `(steps, features)` sequence, dropout disabled.
    pub fn predict(&self, sequence: ArrayView2<'_, f64>) -> f64 {
        self.forward(sequence, None).output
    }

    pub(crate) fn forward_train(
        &self,
        sequence: ArrayView2<'_, f64>,
        rng: &mut StdRng,
    ) -> ForwardPass {
        self.forward(sequence, Some(rng))
    }

    fn forward(&self, sequence: ArrayView2<'_, f64>, mut dropout: Option<&mut StdRng>) -> ForwardPass {
        let rate = self.config.dropout;
        let layers = self.encoder.len();

        let mut encoder = Vec::with_capacity(layers);
        let mut encoder_masks = Vec::with_capacity(layers);
        let mut inputs = sequence.to_owned();

        for (idx, layer) in self.encoder.iter().enumerate() {
            let cache = layer.forward(inputs.view());
            let mut outputs = cache.outputs().to_owned();
            let mask = match dropout.as_deref_mut() {
                Some(rng) if idx + 1 < layers && rate > 0.0 => {
                    let mask = dropout_mask(outputs.raw_dim(), rate, rng);
                    outputs *= &mask;
                    Some(mask)
                }
                _ => None,
            };
            encoder.push(cache);
            encoder_masks.push(mask);
            inputs = outputs;
        }

        let mut activation = encoder
            .last()
            .map(|c| c.final_hidden().to_owned())
            .unwrap_or_else(|| Array1::zeros(self.config.hidden_size));

        let last = self.head.len().saturating_sub(1);
        let mut head_inputs = Vec::with_capacity(self.head.len());
        let mut head_activations = Vec::with_capacity(last);

        for (idx, layer) in self.head.iter().enumerate() {
            let mut z = layer.forward(activation.view());
            head_inputs.push(activation);
            if idx < last {
                let pre_activation = z.clone();
                z.mapv_inplace(relu);
                let mask = match dropout.as_deref_mut() {
                    Some(rng) if rate > 0.0 => {
                        let mask = dropout_mask(z.raw_dim(), rate, rng);
                        z *= &mask;
                        Some(mask)
                    }
                    _ => None,
                };
                head_activations.push((pre_activation, mask));
            }
            activation = z;
        }

        ForwardPass {
            encoder,
            encoder_masks,
            head_inputs,
            head_activations,
            output: activation.first().copied().unwrap_or_default(),
        }
    }

    /// Accumulates into `grads` the gradient of a loss whose derivative w.r.t. the network
    /// output is `output_grad`.
    pub(crate) fn backward(&self, pass: &ForwardPass, output_grad: f64, grads: &mut ForecastNetwork) {
        let mut delta = Array1::from_elem(1, output_grad);

        for idx in (0..self.head.len()).rev() {
            if let Some((pre_activation, mask)) = pass.head_activations.get(idx) {
                if let Some(mask) = mask {
                    delta *= mask;
                }
                Zip::from(&mut delta)
                    .and(pre_activation)
                    .for_each(|d, &z| {
                        if z <= 0.0 {
                            *d = 0.0;
                        }
                    });
            }
            delta = self.head[idx].backward(
                pass.head_inputs[idx].view(),
                delta.view(),
                &mut grads.head[idx],
            );
        }

        let steps = pass.encoder.first().map(|c| c.steps()).unwrap_or(0);
        if steps == 0 {
            return;
        }

        let mut output_grads = Array2::<f64>::zeros((steps, self.config.hidden_size));
        output_grads.row_mut(steps - 1).assign(&delta);

        for idx in (0..self.encoder.len()).rev() {
            if let Some(mask) = &pass.encoder_masks[idx] {
                output_grads *= mask;
            }
            output_grads = self.encoder[idx].backward(
                &pass.encoder[idx],
                output_grads.view(),
                &mut grads.encoder[idx],
            );
        }
    }

    /// A network of the same shape with every parameter set to zero.
    pub(crate) fn zeros_like(&self) -> Self {
        Self {
            config: self.config.clone(),
            encoder: self.encoder.iter().map(LstmLayer::zeros_like).collect(),
            head: self.head.iter().map(DenseLayer::zeros_like).collect(),
        }
    }

    /// Whether the stored tensors agree with each other and with the recorded configuration.
    pub fn is_well_formed(&self) -> bool {
        let mut width = self.config.input_size;
        for layer in &self.encoder {
            if !layer.is_well_formed()
                || layer.input_size() != width
                || layer.hidden_size() != self.config.hidden_size
            {
                return false;
            }
            width = layer.hidden_size();
        }
        if self.encoder.len() != self.config.num_layers
            || self.head.len() != self.config.head_sizes.len() + 1
        {
            return false;
        }
        for (layer, &size) in self
            .head
            .iter()
            .zip(self.config.head_sizes.iter().chain(std::iter::once(&1)))
        {
            if layer.input_size() != width
                || layer.output_size() != size
                || layer.bias.len() != size
            {
                return false;
            }
            width = size;
        }
        true
    }

    pub(crate) fn tensors(&self) -> Vec<ArrayViewD<'_, f64>> {
        let mut tensors = Vec::with_capacity(3 * self.encoder.len() + 2 * self.head.len());
        for layer in &self.encoder {
            tensors.push(layer.input_weights.view().into_dyn());
            tensors.push(layer.hidden_weights.view().into_dyn());
            tensors.push(layer.bias.view().into_dyn());
        }
        for layer in &self.head {
            tensors.push(layer.weights.view().into_dyn());
            tensors.push(layer.bias.view().into_dyn());
        }
        tensors
    }

    pub(crate) fn tensors_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut tensors = Vec::with_capacity(3 * self.encoder.len() + 2 * self.head.len());
        for layer in &mut self.encoder {
            tensors.push(layer.input_weights.view_mut().into_dyn());
            tensors.push(layer.hidden_weights.view_mut().into_dyn());
            tensors.push(layer.bias.view_mut().into_dyn());
        }
        for layer in &mut self.head {
            tensors.push(layer.weights.view_mut().into_dyn());
            tensors.push(layer.bias.view_mut().into_dyn());
        }
        tensors
    }
}

pub(crate) fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

pub(crate) fn relu(value: f64) -> f64 {
    value.max(0.0)
}

/// Inverted dropout mask, kept units are scaled by `1 / (1 - rate)`.
fn dropout_mask<D: Dimension>(dim: D, rate: f64, rng: &mut StdRng) -> Array<f64, D> {
    let keep = 1.0 - rate;
    let scale = 1.0 / keep;
    Array::from_shape_fn(dim, |_| if rng.random_bool(keep) { scale } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn small_network(rng: &mut StdRng) -> ForecastNetwork {
        ForecastNetwork::new(
            ModelConfig {
                input_size: 5,
                hidden_size: 4,
                num_layers: 2,
                head_sizes: vec![6, 3],
                dropout: 0.0,
            },
            rng,
        )
    }

    fn sequence(rng: &mut StdRng) -> Array2<f64> {
        Array2::from_shape_fn((6, 5), |_| rng.random_range(-1.0..1.0))
    }

    #[test]
    fn test_prediction_does_not_depend_on_previous_calls() {
        let mut rng = StdRng::seed_from_u64(7);
        let network = small_network(&mut rng);
        let first = sequence(&mut rng);
        let second = sequence(&mut rng);

        let before = network.predict(first.view());
        network.predict(second.view());
        assert_eq!(before, network.predict(first.view()));
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(42);
        let network = small_network(&mut rng);
        let input = sequence(&mut rng);

        let pass = network.forward(input.view(), None);
        let mut grads = network.zeros_like();
        network.backward(&pass, 1.0, &mut grads);

        let analytic: Vec<Vec<f64>> = grads
            .tensors()
            .iter()
            .map(|t| t.iter().copied().collect())
            .collect();

        let epsilon = 1e-6;
        let tensor_count = analytic.len();
        for tensor in 0..tensor_count {
            let len = analytic[tensor].len();
            for element in [0, len / 2, len - 1] {
                let mut plus = network.clone();
                if let Some(v) = plus.tensors_mut()[tensor].iter_mut().nth(element) {
                    *v += epsilon;
                }
                let mut minus = network.clone();
                if let Some(v) = minus.tensors_mut()[tensor].iter_mut().nth(element) {
                    *v -= epsilon;
                }
                let numeric =
                    (plus.predict(input.view()) - minus.predict(input.view())) / (2.0 * epsilon);
                let expected = analytic[tensor][element];
                assert!(
                    (numeric - expected).abs() <= 1e-5 + 1e-3 * expected.abs(),
                    "tensor {tensor}, element {element}: numeric {numeric}, analytic {expected}"
                );
            }
        }
    }

    #[test]
    fn test_well_formed_detects_shape_mismatch() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut network = small_network(&mut rng);
        assert!(network.is_well_formed());

        network.head[0].bias = Array1::zeros(2);
        assert!(!network.is_well_formed());
    }
}
