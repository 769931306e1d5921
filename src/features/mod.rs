// Features module - legacy, recipe-driven feature extraction
//
// Module organization:
// - recipe: declarative feature recipes (ZCR, MFCC, Compound)
// - engine: the FeatureEngine seam driven by recipe instructions
// - native: in-process engine implementation (rustfft based)
// - audio: audio items, buffers and readers
// - extractor: LegacyFeatureExtractor orchestration
//
// Output of every extraction is a TimedFeatureMatrix: one row per frame,
// one column per feature dimension, rows timed by a FrameGrid.

pub mod audio;
pub mod engine;
pub mod extractor;
pub mod native;
pub mod recipe;

pub use audio::{AudioBuffer, AudioItem, AudioReader, MemoryReader, WavReader};
pub use engine::{FeatureBlocks, FeatureEngine};
pub use extractor::LegacyFeatureExtractor;
pub use native::NativeEngine;
pub use recipe::{
    CompoundRecipe, FeatureRecipe, Instruction, MfccRecipe, RecipeFingerprint, SampleRate,
    ZcrRecipe,
};

use ndarray::{Array2, ArrayView1};

use crate::timing::FrameGrid;

/// Feature matrix (frames x dims) with the timing of its rows
#[derive(Debug, Clone, PartialEq)]
pub struct TimedFeatureMatrix {
    data: Array2<f64>,
    grid: FrameGrid,
}

impl TimedFeatureMatrix {
    pub fn new(data: Array2<f64>, grid: FrameGrid) -> Self {
        Self { data, grid }
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn grid(&self) -> &FrameGrid {
        &self.grid
    }

    pub fn num_frames(&self) -> usize {
        self.data.nrows()
    }

    pub fn dimension(&self) -> usize {
        self.data.ncols()
    }

    /// Feature vector of frame `i`
    pub fn frame(&self, i: usize) -> Option<ArrayView1<'_, f64>> {
        (i < self.num_frames()).then(|| self.data.row(i))
    }

    /// Feature vector of the frame closest to time `t` (seconds)
    pub fn at_time(&self, t: f64) -> Option<ArrayView1<'_, f64>> {
        self.frame(self.grid.closest_frame(t))
    }

    /// Whether any value is NaN or infinite
    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|v| !v.is_finite())
    }

    pub fn into_parts(self) -> (Array2<f64>, FrameGrid) {
        (self.data, self.grid)
    }
}
