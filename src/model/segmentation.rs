// Segmentation module - MFCC -> BiLSTM -> linear forward path
//
// Waveforms (batch, samples, channels) are turned into frame-level class
// scores (batch, frames, classes). Frame timing is exposed through a
// FrameTimingModel derived from the MFCC front-end configuration.

use std::collections::HashMap;

use log::{debug, info};
use ndarray::{s, Array1, Array2, Array3, ArrayView3, Axis};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::linear::{Activation, Linear};
use super::lstm::{BiLstm, LstmWeights};
use super::mfcc::MfccTransform;
use super::task::Specifications;
use crate::config::SegmentationConfig;
use crate::error::{log_model_error, ModelError};
use crate::timing::{FrameGrid, FrameTimingModel};

/// Hidden size of each LSTM direction
pub const LSTM_HIDDEN_SIZE: usize = 32;

/// Named parameter tensor, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }
}

/// Output dimension of a model built against `specifications`
///
/// # Errors
/// `ModelError::MultiTaskUnsupported` for multi-task specifications
pub fn output_dimension(specifications: &Specifications) -> Result<usize, ModelError> {
    match specifications {
        Specifications::Multi(tasks) => Err(ModelError::MultiTaskUnsupported {
            num_tasks: tasks.len(),
        }),
        Specifications::Single(task) if task.uses_powerset() => Ok(task.num_powerset_classes()),
        Specifications::Single(task) => Ok(task.num_classes()),
    }
}

/// Small segmentation model: MFCC front-end, bidirectional LSTM, linear classifier
pub struct SimpleSegmentation {
    config: SegmentationConfig,
    mfcc: MfccTransform,
    lstm: BiLstm,
    classifier: Linear,
    activation: Activation,
}

impl SimpleSegmentation {
    /// Build a model for a single-task specification
    ///
    /// Weights are initialized from `config.seed`; use `load_parameters`
    /// to install trained weights.
    ///
    /// # Errors
    /// * `MultiTaskUnsupported` - `specifications` holds several tasks
    /// * `InvalidConfig` - inconsistent front-end parameters or an empty output
    pub fn new(
        config: SegmentationConfig,
        specifications: &Specifications,
    ) -> Result<Self, ModelError> {
        let dimension = output_dimension(specifications).map_err(|err| {
            log_model_error(&err, "SimpleSegmentation::new");
            err
        })?;
        if dimension == 0 {
            return Err(ModelError::InvalidConfig {
                reason: "task specification has no classes".to_string(),
            });
        }

        config.validate()?;

        let mfcc = MfccTransform::new(
            config.sample_rate,
            config.n_mfcc,
            config.n_fft,
            config.hop_length,
            config.n_mels,
            config.center,
            config.top_db,
        )?;

        let Specifications::Single(task) = specifications else {
            return Err(ModelError::MultiTaskUnsupported {
                num_tasks: specifications.num_tasks(),
            });
        };
        let activation = Activation::for_task(task);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let input_size = config.num_channels * config.n_mfcc;
        let lstm = BiLstm::init(input_size, LSTM_HIDDEN_SIZE, &mut rng);
        let classifier = Linear::init(lstm.output_size(), dimension, &mut rng);

        info!(
            "SimpleSegmentation ready: {} channel(s) x {} MFCC -> {} classes ({:?})",
            config.num_channels, config.n_mfcc, dimension, activation
        );

        Ok(Self {
            config,
            mfcc,
            lstm,
            classifier,
            activation,
        })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Number of output classes per frame
    pub fn dimension(&self) -> usize {
        self.classifier.out_features()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn timing(&self) -> &FrameTimingModel {
        self.mfcc.timing()
    }

    /// Number of output frames for `num_samples` input samples
    pub fn num_frames(&self, num_samples: usize) -> usize {
        self.timing().num_frames(num_samples)
    }

    /// Number of input samples seen by `num_frames` consecutive output frames
    pub fn receptive_field_size(&self, num_frames: usize) -> usize {
        self.timing().receptive_field_size(num_frames)
    }

    /// Timing of the receptive field of each output frame
    pub fn receptive_field(&self) -> &FrameGrid {
        self.timing().receptive_field()
    }

    /// Compute frame-level scores
    ///
    /// # Arguments
    /// * `waveforms` - Shape (batch, samples, channels)
    ///
    /// # Returns
    /// Scores with shape (batch, frames, dimension)
    pub fn forward(&self, waveforms: ArrayView3<f32>) -> Result<Array3<f32>, ModelError> {
        let (batch, num_samples, num_channels) = waveforms.dim();
        if num_channels != self.config.num_channels {
            let err = ModelError::InvalidInput {
                reason: format!(
                    "expected {} channel(s), got {}",
                    self.config.num_channels, num_channels
                ),
            };
            log_model_error(&err, "SimpleSegmentation::forward");
            return Err(err);
        }

        let num_frames = self.num_frames(num_samples);
        let n_mfcc = self.mfcc.n_mfcc();
        let mut scores = Array3::<f32>::zeros((batch, num_frames, self.dimension()));

        for (item, mut out) in waveforms.axis_iter(Axis(0)).zip(scores.axis_iter_mut(Axis(0))) {
            // (channels, coefs, frames)
            let mfcc = self.mfcc.transform(item)?;

            // (frames, channels * coefs), channel-major
            let mut features = Array2::<f32>::zeros((num_frames, num_channels * n_mfcc));
            for (c, channel) in mfcc.axis_iter(Axis(0)).enumerate() {
                features
                    .slice_mut(s![.., c * n_mfcc..(c + 1) * n_mfcc])
                    .assign(&channel.t());
            }

            let encoded = self.lstm.forward(features.view());
            let logits = self.classifier.forward(encoded.view());
            out.assign(&self.activation.apply(logits));
        }

        debug!(
            "Forward pass: batch={}, samples={}, frames={}",
            batch, num_samples, num_frames
        );

        Ok(scores)
    }

    /// Replace weights with named tensors
    ///
    /// Recognized names: `lstm.weight_ih_l0`, `lstm.weight_hh_l0`,
    /// `lstm.bias_ih_l0`, `lstm.bias_hh_l0` (plus `_reverse` variants for the
    /// backward direction), `classifier.weight` and `classifier.bias`.
    /// Every tensor is checked before any weight is replaced, so a failed
    /// load leaves the model unchanged.
    pub fn load_parameters(
        &mut self,
        parameters: &HashMap<String, Tensor>,
    ) -> Result<(), ModelError> {
        let mut lstm = self.lstm.clone();
        let mut classifier = self.classifier.clone();

        for (name, tensor) in parameters {
            match name.as_str() {
                "classifier.weight" => classifier.weight = matrix(name, tensor, classifier.weight.dim())?,
                "classifier.bias" => classifier.bias = vector(name, tensor, classifier.bias.len())?,
                _ => {
                    let (direction, field) = match name.strip_suffix("_reverse") {
                        Some(stem) => (&mut lstm.backward, stem),
                        None => (&mut lstm.forward, name.as_str()),
                    };
                    load_lstm_tensor(direction, field, name, tensor)?;
                }
            }
        }

        self.lstm = lstm;
        self.classifier = classifier;
        info!("Loaded {} parameter tensor(s)", parameters.len());
        Ok(())
    }
}

fn load_lstm_tensor(
    weights: &mut LstmWeights,
    field: &str,
    name: &str,
    tensor: &Tensor,
) -> Result<(), ModelError> {
    match field {
        "lstm.weight_ih_l0" => weights.weight_ih = matrix(name, tensor, weights.weight_ih.dim())?,
        "lstm.weight_hh_l0" => weights.weight_hh = matrix(name, tensor, weights.weight_hh.dim())?,
        "lstm.bias_ih_l0" => weights.bias_ih = vector(name, tensor, weights.bias_ih.len())?,
        "lstm.bias_hh_l0" => weights.bias_hh = vector(name, tensor, weights.bias_hh.len())?,
        _ => {
            return Err(ModelError::InvalidParameters {
                name: name.to_string(),
                expected: Vec::new(),
                found: tensor.shape.clone(),
            })
        }
    }
    Ok(())
}

fn shape_mismatch(name: &str, expected: Vec<usize>, tensor: &Tensor) -> ModelError {
    ModelError::InvalidParameters {
        name: name.to_string(),
        expected,
        found: tensor.shape.clone(),
    }
}

fn matrix(name: &str, tensor: &Tensor, dim: (usize, usize)) -> Result<Array2<f32>, ModelError> {
    if tensor.shape != [dim.0, dim.1] {
        return Err(shape_mismatch(name, vec![dim.0, dim.1], tensor));
    }
    Array2::from_shape_vec(dim, tensor.data.clone())
        .map_err(|_| shape_mismatch(name, vec![dim.0, dim.1], tensor))
}

fn vector(name: &str, tensor: &Tensor, len: usize) -> Result<Array1<f32>, ModelError> {
    if tensor.shape != [len] || tensor.data.len() != len {
        return Err(shape_mismatch(name, vec![len], tensor));
    }
    Ok(Array1::from_vec(tensor.data.clone()))
}
