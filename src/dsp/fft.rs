// FFT module - Fast Fourier Transform computation
//
// This module handles FFT computation with windowing to reduce spectral
// leakage. Spectra are used by the cepstral features of the native engine
// and by the MFCC transform of the segmentation model.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Hann window of `length` samples
///
/// # Arguments
/// * `length` - Window length in samples
/// * `periodic` - Periodic window (DFT-even, as used by STFT front-ends)
///   instead of the symmetric one
pub fn hann_window(length: usize, periodic: bool) -> Vec<f64> {
    if length == 1 {
        return vec![1.0];
    }

    let denominator = if periodic {
        length as f64
    } else {
        length as f64 - 1.0
    };

    (0..length)
        .map(|i| 0.5 * (1.0 - ((2.0 * std::f64::consts::PI * i as f64) / denominator).cos()))
        .collect()
}

/// Computes one-sided spectra of fixed-size windowed frames
///
/// The FFT is planned once at construction and reused for every frame.
pub struct SpectrumProcessor {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
    window: Vec<f64>,
}

impl SpectrumProcessor {
    /// Create a new spectrum processor
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (frames shorter than this are zero-padded)
    /// * `window` - Analysis window applied to each frame (length <= fft_size)
    pub fn new(fft_size: usize, window: Vec<f64>) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            window,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of one-sided frequency bins
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Compute the power spectrum |X[k]|^2 of a frame
    ///
    /// # Arguments
    /// * `frame` - Frame samples (length <= window length, zero-padded)
    ///
    /// # Returns
    /// Power spectrum (size = fft_size / 2 + 1)
    pub fn power_spectrum(&self, frame: &[f64]) -> Vec<f64> {
        self.transform(frame).iter().map(|c| c.norm_sqr()).collect()
    }

    /// Compute the magnitude spectrum |X[k]| of a frame
    pub fn magnitude_spectrum(&self, frame: &[f64]) -> Vec<f64> {
        self.transform(frame).iter().map(|c| c.norm()).collect()
    }

    fn transform(&self, frame: &[f64]) -> Vec<Complex<f64>> {
        let mut buffer: Vec<Complex<f64>> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(&sample, &weight)| Complex::new(sample * weight, 0.0))
            .collect();

        // Pad with zeros if needed
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);
        buffer.truncate(self.num_bins());
        buffer
    }
}
