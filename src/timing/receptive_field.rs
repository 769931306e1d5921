// FrameTimingModel - STFT frame bookkeeping
//
// Relates the number of input samples of a short-time transform to the number
// of output frames (forward) and the number of output frames to the span of
// input samples that influences them (backward).
//
// Forward:  centered -> 1 + n / hop
//           otherwise -> 1 + (n - window) / hop
// Backward: centered -> (f - 1) * hop
//           otherwise -> (f - 1) * hop + window
//
// Integer division loses information: receptive_field_size(num_frames(n)) is
// not n in general.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::OnceCell;

use super::FrameGrid;
use crate::error::FeatureError;

/// Frame timing of a fixed short-time transform configuration
///
/// The `num_frames` memo is guarded by a mutex, so a model can be shared
/// across threads. It is never invalidated: the configuration is immutable.
#[derive(Debug)]
pub struct FrameTimingModel {
    hop_length: usize,
    window_length: usize,
    centered: bool,
    sample_rate: u32,
    frames_cache: Mutex<HashMap<usize, usize>>,
    receptive_field: OnceCell<FrameGrid>,
}

impl FrameTimingModel {
    /// Create a timing model for a short-time transform
    ///
    /// # Arguments
    /// * `hop_length` - Samples between consecutive frames (> 0)
    /// * `window_length` - Samples per analysis window (> 0)
    /// * `centered` - Whether frames are centered on their timestamp (padded input)
    /// * `sample_rate` - Input sample rate in Hz (> 0)
    pub fn new(
        hop_length: usize,
        window_length: usize,
        centered: bool,
        sample_rate: u32,
    ) -> Result<Self, FeatureError> {
        if sample_rate == 0 {
            return Err(FeatureError::InvalidSampleRate { sample_rate });
        }
        if hop_length == 0 || window_length == 0 {
            return Err(FeatureError::InvalidFrameGrid {
                duration: window_length as f64,
                step: hop_length as f64,
            });
        }

        Ok(Self {
            hop_length,
            window_length,
            centered,
            sample_rate,
            frames_cache: Mutex::new(HashMap::new()),
            receptive_field: OnceCell::new(),
        })
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn centered(&self) -> bool {
        self.centered
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of output frames for `num_samples` input samples
    ///
    /// Non-centered transforms fed fewer than `window_length` samples yield 0.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if let Ok(cache) = self.frames_cache.lock() {
            if let Some(&frames) = cache.get(&num_samples) {
                return frames;
            }
        }

        let frames = if self.centered {
            1 + num_samples / self.hop_length
        } else if num_samples < self.window_length {
            0
        } else {
            1 + (num_samples - self.window_length) / self.hop_length
        };

        // A poisoned memo only costs a recomputation next time
        if let Ok(mut cache) = self.frames_cache.lock() {
            cache.insert(num_samples, frames);
        }

        frames
    }

    /// Number of input samples influencing `num_frames` consecutive frames
    ///
    /// `num_frames == 0` is treated like a single frame.
    pub fn receptive_field_size(&self, num_frames: usize) -> usize {
        let extent = num_frames.saturating_sub(1) * self.hop_length;
        if self.centered {
            extent
        } else {
            extent + self.window_length
        }
    }

    /// Receptive field of every output frame, in seconds
    ///
    /// Computed on first access and kept for the lifetime of the model.
    pub fn receptive_field(&self) -> &FrameGrid {
        self.receptive_field.get_or_init(|| FrameGrid {
            start: 0.0,
            duration: self.window_length as f64 / self.sample_rate as f64,
            step: self.hop_length as f64 / self.sample_rate as f64,
        })
    }

    /// Number of memoized `num_frames` entries
    pub fn cached_entries(&self) -> usize {
        self.frames_cache
            .lock()
            .map(|cache| cache.len())
            .unwrap_or(0)
    }
}
