// LSTM module - single-layer bidirectional recurrent encoder
//
// Gate layout follows the common packed convention: the 4 * hidden rows of
// every weight matrix are [input, forget, cell, output].

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

/// Weights of one LSTM direction
#[derive(Debug, Clone)]
pub struct LstmWeights {
    /// Shape (4 * hidden, input_size)
    pub weight_ih: Array2<f32>,
    /// Shape (4 * hidden, hidden)
    pub weight_hh: Array2<f32>,
    /// Shape (4 * hidden,)
    pub bias_ih: Array1<f32>,
    /// Shape (4 * hidden,)
    pub bias_hh: Array1<f32>,
}

impl LstmWeights {
    /// Uniform init in [-1/sqrt(hidden), 1/sqrt(hidden)]
    pub fn init<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (hidden_size.max(1) as f32).sqrt();
        let mut sample = |shape: (usize, usize)| {
            Array2::from_shape_fn(shape, |_| rng.gen_range(-bound..=bound))
        };

        let weight_ih = sample((4 * hidden_size, input_size));
        let weight_hh = sample((4 * hidden_size, hidden_size));
        let bias_ih = sample((1, 4 * hidden_size)).row(0).to_owned();
        let bias_hh = sample((1, 4 * hidden_size)).row(0).to_owned();

        Self {
            weight_ih,
            weight_hh,
            bias_ih,
            bias_hh,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.weight_hh.ncols()
    }

    pub fn input_size(&self) -> usize {
        self.weight_ih.ncols()
    }

    /// Run over `input` (steps, input_size) and return hidden states (steps, hidden)
    ///
    /// # Arguments
    /// * `reverse` - Process steps last to first; output rows stay in input order
    fn run(&self, input: ArrayView2<f32>, reverse: bool) -> Array2<f32> {
        let hidden = self.hidden_size();
        let steps = input.nrows();

        // Input projection for all steps at once: (steps, 4 * hidden)
        let projected = input.dot(&self.weight_ih.t()) + &self.bias_ih + &self.bias_hh;

        let mut output = Array2::<f32>::zeros((steps, hidden));
        let mut h = Array1::<f32>::zeros(hidden);
        let mut c = Array1::<f32>::zeros(hidden);

        let order: Box<dyn Iterator<Item = usize>> = if reverse {
            Box::new((0..steps).rev())
        } else {
            Box::new(0..steps)
        };

        for t in order {
            let gates = &projected.row(t) + &self.weight_hh.dot(&h);
            let (h_next, c_next) = cell_update(gates.view(), c.view(), hidden);
            output.row_mut(t).assign(&h_next);
            h = h_next;
            c = c_next;
        }

        output
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn cell_update(
    gates: ArrayView1<f32>,
    c: ArrayView1<f32>,
    hidden: usize,
) -> (Array1<f32>, Array1<f32>) {
    let i = gates.slice(s![0..hidden]).mapv(sigmoid);
    let f = gates.slice(s![hidden..2 * hidden]).mapv(sigmoid);
    let g = gates.slice(s![2 * hidden..3 * hidden]).mapv(f32::tanh);
    let o = gates.slice(s![3 * hidden..4 * hidden]).mapv(sigmoid);

    let c_next = &f * &c + &i * &g;
    let h_next = &o * &c_next.mapv(f32::tanh);
    (h_next, c_next)
}

/// Bidirectional LSTM: forward and backward states concatenated per step
#[derive(Debug, Clone)]
pub struct BiLstm {
    pub forward: LstmWeights,
    pub backward: LstmWeights,
}

impl BiLstm {
    pub fn init<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        Self {
            forward: LstmWeights::init(input_size, hidden_size, rng),
            backward: LstmWeights::init(input_size, hidden_size, rng),
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.forward.hidden_size()
    }

    /// Size of each output row (2 * hidden)
    pub fn output_size(&self) -> usize {
        2 * self.hidden_size()
    }

    /// Encode a sequence (steps, input_size) into (steps, 2 * hidden)
    pub fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let hidden = self.hidden_size();
        let mut output = Array2::<f32>::zeros((input.nrows(), 2 * hidden));
        output
            .slice_mut(s![.., 0..hidden])
            .assign(&self.forward.run(input, false));
        output
            .slice_mut(s![.., hidden..])
            .assign(&self.backward.run(input, true));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    fn zero_weights(input_size: usize, hidden: usize) -> LstmWeights {
        LstmWeights {
            weight_ih: Array2::zeros((4 * hidden, input_size)),
            weight_hh: Array2::zeros((4 * hidden, hidden)),
            bias_ih: Array1::zeros(4 * hidden),
            bias_hh: Array1::zeros(4 * hidden),
        }
    }

    #[test]
    fn test_single_step_by_hand() {
        // hidden = 1, input = 1: gates = [i, f, g, o] = w * x
        let mut weights = zero_weights(1, 1);
        weights.weight_ih = array![[1.0], [0.0], [1.0], [1.0]];

        let output = weights.run(array![[0.5]].view(), false);

        let i = sigmoid(0.5);
        let g = 0.5f32.tanh();
        let o = sigmoid(0.5);
        let expected = o * (i * g).tanh();
        assert!((output[[0, 0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_state_carries_over_steps() {
        let mut weights = zero_weights(1, 1);
        weights.weight_ih = array![[1.0], [0.0], [1.0], [1.0]];
        // Forget gate wide open: cell keeps accumulating
        weights.bias_ih = array![0.0, 20.0, 0.0, 0.0];

        let output = weights.run(array![[1.0], [0.0]].view(), false);
        assert!(output[[0, 0]] > 0.0);
        // Second step has zero input but non-zero cell state
        assert!(output[[1, 0]] > 0.0);

        let reversed = weights.run(array![[1.0], [0.0]].view(), true);
        // Backward pass sees the zero step first
        assert!(reversed[[1, 0]].abs() < 1e-6);
        assert!((reversed[[0, 0]] - output[[0, 0]]).abs() < 1e-6);
    }

    #[test]
    fn test_bidirectional_output_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let lstm = BiLstm::init(40, 32, &mut rng);
        let input = Array2::from_shape_fn((10, 40), |(t, d)| ((t + d) as f32 * 0.1).sin());

        let output = lstm.forward(input.view());
        assert_eq!(output.dim(), (10, 64));
        assert_eq!(lstm.output_size(), 64);
        assert!(output.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_init_is_seeded() {
        let a = BiLstm::init(4, 3, &mut StdRng::seed_from_u64(1));
        let b = BiLstm::init(4, 3, &mut StdRng::seed_from_u64(1));
        assert_eq!(a.forward.weight_ih, b.forward.weight_ih);
        assert_eq!(a.backward.bias_hh, b.backward.bias_hh);
        assert!(a.forward.weight_ih.iter().all(|w| w.abs() <= 1.0 / 3f32.sqrt()));
    }
}
