use ndarray::{linalg::general_mat_mul, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

use super::sigmoid;

/// A single LSTM layer with the four gates stacked row-wise as input, forget, cell and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayer {
    /// `(4 * hidden, input)`
    pub(crate) input_weights: Array2<f64>,
    /// `(4 * hidden, hidden)`
    pub(crate) hidden_weights: Array2<f64>,
    pub(crate) bias: Array1<f64>,
}

/// Activations of one forward pass, kept for backpropagation through time.
#[derive(Debug, Clone)]
pub(crate) struct LstmCache {
    inputs: Array2<f64>,
    /// Row `t + 1` holds the hidden state after step `t`, row 0 is the zero initial state.
    hidden: Array2<f64>,
    cells: Array2<f64>,
    /// Gate activations per step.
    gates: Array2<f64>,
}

impl LstmCache {
    pub(crate) fn outputs(&self) -> ArrayView2<'_, f64> {
        self.hidden.slice(s![1.., ..])
    }

    pub(crate) fn final_hidden(&self) -> ArrayView1<'_, f64> {
        self.hidden.row(self.hidden.nrows() - 1)
    }

    pub(crate) fn steps(&self) -> usize {
        self.inputs.nrows()
    }
}

impl LstmLayer {
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (hidden_size as f64).sqrt();
        let mut uniform = |shape: (usize, usize)| {
            Array2::from_shape_fn(shape, |_| rng.random_range(-bound..=bound))
        };
        let input_weights = uniform((4 * hidden_size, input_size));
        let hidden_weights = uniform((4 * hidden_size, hidden_size));
        let bias = Array1::from_shape_fn(4 * hidden_size, |_| rng.random_range(-bound..=bound));

        Self {
            input_weights,
            hidden_weights,
            bias,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_weights.ncols()
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_weights.ncols()
    }

    pub(crate) fn zeros_like(&self) -> Self {
        Self {
            input_weights: Array2::zeros(self.input_weights.raw_dim()),
            hidden_weights: Array2::zeros(self.hidden_weights.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        let hidden = self.hidden_size();
        self.input_weights.nrows() == 4 * hidden
            && self.hidden_weights.nrows() == 4 * hidden
            && self.bias.len() == 4 * hidden
    }

    /// Runs the layer over `inputs` (`steps x input`) starting from zero hidden and cell state.
    pub(crate) fn forward(&self, inputs: ArrayView2<'_, f64>) -> LstmCache {
        let steps = inputs.nrows();
        let h = self.hidden_size();

        let mut hidden = Array2::<f64>::zeros((steps + 1, h));
        let mut cells = Array2::<f64>::zeros((steps + 1, h));
        let mut gates = Array2::<f64>::zeros((steps, 4 * h));

        for t in 0..steps {
            let mut z = self.input_weights.dot(&inputs.row(t))
                + self.hidden_weights.dot(&hidden.row(t))
                + &self.bias;
            z.slice_mut(s![..2 * h]).mapv_inplace(sigmoid);
            z.slice_mut(s![2 * h..3 * h]).mapv_inplace(f64::tanh);
            z.slice_mut(s![3 * h..]).mapv_inplace(sigmoid);

            let input_gate = z.slice(s![..h]);
            let forget_gate = z.slice(s![h..2 * h]);
            let candidate = z.slice(s![2 * h..3 * h]);
            let output_gate = z.slice(s![3 * h..]);

            let cell = &forget_gate * &cells.row(t) + &input_gate * &candidate;
            let next_hidden = &output_gate * &cell.mapv(f64::tanh);

            cells.row_mut(t + 1).assign(&cell);
            hidden.row_mut(t + 1).assign(&next_hidden);
            gates.row_mut(t).assign(&z);
        }

        LstmCache {
            inputs: inputs.to_owned(),
            hidden,
            cells,
            gates,
        }
    }

    /// Backpropagation through time. `output_grads` is the loss gradient w.r.t. every step's
    /// hidden output, parameter gradients are accumulated into `grads` and the gradient w.r.t.
    /// the layer inputs is returned.
    pub(crate) fn backward(
        &self,
        cache: &LstmCache,
        output_grads: ArrayView2<'_, f64>,
        grads: &mut LstmLayer,
    ) -> Array2<f64> {
        let steps = cache.steps();
        let h = self.hidden_size();

        let mut input_grads = Array2::<f64>::zeros(cache.inputs.raw_dim());
        let mut hidden_next = Array1::<f64>::zeros(h);
        let mut cell_next = Array1::<f64>::zeros(h);

        for t in (0..steps).rev() {
            let gates = cache.gates.row(t);
            let input_gate = gates.slice(s![..h]);
            let forget_gate = gates.slice(s![h..2 * h]);
            let candidate = gates.slice(s![2 * h..3 * h]);
            let output_gate = gates.slice(s![3 * h..]);

            let cell_tanh = cache.cells.row(t + 1).mapv(f64::tanh);
            let cell_prev = cache.cells.row(t);

            let d_hidden = &output_grads.row(t) + &hidden_next;
            let d_cell =
                &d_hidden * &output_gate * &cell_tanh.mapv(|v| 1.0 - v * v) + &cell_next;

            let mut dz = Array1::<f64>::zeros(4 * h);
            dz.slice_mut(s![..h])
                .assign(&(&d_cell * &candidate * &input_gate.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![h..2 * h])
                .assign(&(&d_cell * &cell_prev * &forget_gate.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * h..3 * h])
                .assign(&(&d_cell * &input_gate * &candidate.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * h..])
                .assign(&(&d_hidden * &cell_tanh * &output_gate.mapv(|v| v * (1.0 - v))));

            let dz_column = dz.view().insert_axis(Axis(1));
            general_mat_mul(
                1.0,
                &dz_column,
                &cache.inputs.row(t).insert_axis(Axis(0)),
                1.0,
                &mut grads.input_weights,
            );
            general_mat_mul(
                1.0,
                &dz_column,
                &cache.hidden.row(t).insert_axis(Axis(0)),
                1.0,
                &mut grads.hidden_weights,
            );
            grads.bias += &dz;

            input_grads
                .row_mut(t)
                .assign(&self.input_weights.t().dot(&dz));
            hidden_next = self.hidden_weights.t().dot(&dz);
            cell_next = &d_cell * &forget_gate;
        }

        input_grads
    }
}
