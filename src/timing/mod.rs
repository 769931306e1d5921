// Timing module - sliding-window frame alignment
//
// This module holds the two primitives shared by the legacy extraction path
// and the neural segmentation path:
// - FrameGrid: uniform sliding window over the time axis (start, duration, step)
// - FrameTimingModel: samples <-> frames bookkeeping for a fixed STFT config
//
// Frame i of a grid covers [start + i*step, start + i*step + duration).

mod receptive_field;

pub use receptive_field::FrameTimingModel;

use serde::{Deserialize, Serialize};

use crate::error::FeatureError;

/// Uniform sliding window over a time axis, in seconds
///
/// Immutable once constructed. `duration` and `step` are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameGrid {
    start: f64,
    duration: f64,
    step: f64,
}

impl FrameGrid {
    /// Create a new frame grid
    ///
    /// # Arguments
    /// * `start` - Start time of the first frame (may be negative)
    /// * `duration` - Duration of every frame (> 0)
    /// * `step` - Distance between consecutive frame starts (> 0)
    pub fn new(start: f64, duration: f64, step: f64) -> Result<Self, FeatureError> {
        let valid = start.is_finite()
            && duration.is_finite()
            && step.is_finite()
            && duration > 0.0
            && step > 0.0;
        if !valid {
            return Err(FeatureError::InvalidFrameGrid { duration, step });
        }

        Ok(Self {
            start,
            duration,
            step,
        })
    }

    /// Grid whose frames are centered on multiples of `step`
    ///
    /// Frame i is centered on `i * step`, so the window starts half a frame
    /// before its timestamp.
    pub fn centered(duration: f64, step: f64) -> Result<Self, FeatureError> {
        Self::new(-0.5 * duration, duration, step)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Start time of frame `i`
    pub fn frame_start(&self, i: usize) -> f64 {
        self.start + i as f64 * self.step
    }

    /// End time of frame `i`
    pub fn frame_end(&self, i: usize) -> f64 {
        self.frame_start(i) + self.duration
    }

    /// Time middle of frame `i`
    pub fn frame_middle(&self, i: usize) -> f64 {
        self.frame_start(i) + 0.5 * self.duration
    }

    /// (start, end) of frame `i`
    pub fn frame(&self, i: usize) -> (f64, f64) {
        (self.frame_start(i), self.frame_end(i))
    }

    /// Index of the frame whose middle is closest to time `t`
    ///
    /// Times before the first frame middle map to frame 0.
    pub fn closest_frame(&self, t: f64) -> usize {
        let index = ((t - self.start - 0.5 * self.duration) / self.step).round();
        if index.is_nan() || index < 0.0 {
            0
        } else {
            index as usize
        }
    }

    /// Number of frames indexed by a signal of `duration` seconds
    ///
    /// One frame per started step: `ceil(duration / step)`. This is the row
    /// count a feature matrix aligned on this grid has for that signal.
    pub fn frames_within(&self, duration: f64) -> usize {
        if !(duration > 0.0) {
            return 0;
        }

        // Absorb float noise such as 1.0 / 0.01 = 100.00000000000001
        let ratio = duration / self.step;
        let nearest = ratio.round();
        if (ratio - nearest).abs() < 1e-9 {
            nearest as usize
        } else {
            ratio.ceil() as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_frame_bounds_follow_step() {
        let grid = FrameGrid::new(-0.0125, 0.025, 0.010).unwrap();

        for i in 0..1000 {
            let (start, end) = grid.frame(i);
            assert!((start - (-0.0125 + i as f64 * 0.010)).abs() < EPSILON);
            assert!((end - start - 0.025).abs() < EPSILON);
        }
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        assert!(FrameGrid::new(0.0, 0.0, 0.01).is_err());
        assert!(FrameGrid::new(0.0, 0.025, 0.0).is_err());
        assert!(FrameGrid::new(0.0, -1.0, 0.01).is_err());
        assert!(FrameGrid::new(0.0, 0.025, -0.01).is_err());
        assert!(FrameGrid::new(f64::NAN, 0.025, 0.01).is_err());
        assert!(FrameGrid::new(0.0, f64::INFINITY, 0.01).is_err());
    }

    #[test]
    fn test_centered_grid_starts_half_a_frame_early() {
        let grid = FrameGrid::centered(0.025, 0.010).unwrap();
        assert_eq!(grid.start(), -0.0125);
        assert!((grid.frame_middle(0)).abs() < EPSILON);
        assert!((grid.frame_middle(10) - 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_closest_frame() {
        let grid = FrameGrid::centered(0.025, 0.010).unwrap();
        assert_eq!(grid.closest_frame(-1.0), 0);
        assert_eq!(grid.closest_frame(0.0), 0);
        assert_eq!(grid.closest_frame(0.0049), 0);
        assert_eq!(grid.closest_frame(0.0051), 1);
        assert_eq!(grid.closest_frame(1.0), 100);
    }

    #[test]
    fn test_frames_within() {
        let grid = FrameGrid::centered(0.025, 0.010).unwrap();
        assert_eq!(grid.frames_within(0.0), 0);
        assert_eq!(grid.frames_within(1.0), 100);
        assert_eq!(grid.frames_within(1.001), 101);
        assert_eq!(grid.frames_within(0.005), 1);
    }
}
