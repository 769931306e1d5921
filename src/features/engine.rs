// Engine module - feature extraction engine seam
//
// The legacy extractor never computes features itself. It hands the recipe's
// instructions to an engine, then asks the engine to process a (1, N) f64
// signal and returns one block per instruction name.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView2};

use super::recipe::{Instruction, SampleRate};
use crate::error::FeatureError;

/// Named feature blocks, each with shape (frames, dims)
pub type FeatureBlocks = HashMap<String, Array2<f64>>;

/// External DSP engine driven by recipe instructions
pub trait FeatureEngine {
    /// Replace the engine configuration with `instructions` at `sample_rate`
    ///
    /// Must fail with [`FeatureError::FeaturePlan`] if any instruction is
    /// rejected; a partially configured engine must not be used.
    fn configure(
        &mut self,
        sample_rate: SampleRate,
        instructions: &[Instruction],
    ) -> Result<(), FeatureError>;

    /// Process a (1, num_samples) signal with the current configuration
    fn process(&mut self, samples: ArrayView2<f64>) -> Result<FeatureBlocks, FeatureError>;

    /// Number of frames the current configuration yields for `num_samples`
    fn frame_count(&self, num_samples: usize) -> Option<usize> {
        let _ = num_samples;
        None
    }
}

impl<E: FeatureEngine + ?Sized> FeatureEngine for Box<E> {
    fn configure(
        &mut self,
        sample_rate: SampleRate,
        instructions: &[Instruction],
    ) -> Result<(), FeatureError> {
        (**self).configure(sample_rate, instructions)
    }

    fn process(&mut self, samples: ArrayView2<f64>) -> Result<FeatureBlocks, FeatureError> {
        (**self).process(samples)
    }

    fn frame_count(&self, num_samples: usize) -> Option<usize> {
        (**self).frame_count(num_samples)
    }
}
