// Linear module - affine map and output activations

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::task::{Problem, TaskSpecification};

/// Fully connected layer: y = x W^T + b
#[derive(Debug, Clone)]
pub struct Linear {
    /// Shape (out_features, in_features)
    pub weight: Array2<f32>,
    /// Shape (out_features,)
    pub bias: Array1<f32>,
}

impl Linear {
    /// Uniform init in [-1/sqrt(in), 1/sqrt(in)], as PyTorch does
    pub fn init<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        Self {
            weight: Array2::from_shape_fn((out_features, in_features), |_| {
                rng.gen_range(-bound..=bound)
            }),
            bias: Array1::from_shape_fn(out_features, |_| rng.gen_range(-bound..=bound)),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    /// Apply to every row of `input` (rows, in_features)
    pub fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        input.dot(&self.weight.t()) + &self.bias
    }
}

/// Final activation applied along the class axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Sigmoid,
    Softmax,
    LogSoftmax,
}

impl Activation {
    /// Activation matching a task
    ///
    /// Powerset and mono-label tasks use log-softmax; binary and multi-label
    /// tasks use an independent sigmoid per class.
    pub fn for_task(task: &TaskSpecification) -> Self {
        if task.uses_powerset() {
            return Activation::LogSoftmax;
        }

        match task.problem {
            Problem::BinaryClassification | Problem::MultiLabelClassification => {
                Activation::Sigmoid
            }
            Problem::MonoLabelClassification => Activation::LogSoftmax,
        }
    }

    /// Apply row-wise to (rows, classes) scores
    pub fn apply(self, mut scores: Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Sigmoid => scores.mapv_inplace(|x| 1.0 / (1.0 + (-x).exp())),
            Activation::Softmax | Activation::LogSoftmax => {
                for mut row in scores.axis_iter_mut(Axis(0)) {
                    // Shift by the row max so the largest term is exp(0)
                    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                    row.mapv_inplace(|x| x - max);
                    let sum = row.iter().map(|x| x.exp()).sum::<f32>();
                    if self == Activation::Softmax {
                        row.mapv_inplace(|x| x.exp() / sum);
                    } else {
                        let log_sum = sum.ln();
                        row.mapv_inplace(|x| x - log_sum);
                    }
                }
            }
        }
        scores
    }
}
