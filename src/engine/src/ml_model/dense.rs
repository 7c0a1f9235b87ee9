use ndarray::{linalg::general_mat_mul, Array1, Array2, ArrayView1, Axis};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

/// Fully connected layer, `weights` is `(output, input)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub(crate) weights: Array2<f64>,
    pub(crate) bias: Array1<f64>,
}

impl DenseLayer {
    pub fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (input_size.max(1) as f64).sqrt();
        let weights = Array2::from_shape_fn((output_size, input_size), |_| {
            rng.random_range(-bound..=bound)
        });
        let bias = Array1::from_shape_fn(output_size, |_| rng.random_range(-bound..=bound));
        Self { weights, bias }
    }

    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    pub(crate) fn zeros_like(&self) -> Self {
        Self {
            weights: Array2::zeros(self.weights.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    pub(crate) fn forward(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        self.weights.dot(&input) + &self.bias
    }

    pub(crate) fn backward(
        &self,
        input: ArrayView1<'_, f64>,
        output_grad: ArrayView1<'_, f64>,
        grads: &mut DenseLayer,
    ) -> Array1<f64> {
        general_mat_mul(
            1.0,
            &output_grad.view().insert_axis(Axis(1)),
            &input.view().insert_axis(Axis(0)),
            1.0,
            &mut grads.weights,
        );
        grads.bias += &output_grad;
        self.weights.t().dot(&output_grad)
    }
}
