// MFCC front-end of the segmentation model
//
// Pipeline per channel:
//   reflect pad (centered) -> periodic Hann STFT -> power spectrum
//   -> mel filterbank -> decibels -> orthonormal DCT
//
// The decibel floor (top_db) is applied per item across all of its
// channels, so every channel of an item shares one reference maximum.

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};

use crate::dsp::{dct_basis, hann_window, mel_filterbank, SpectrumProcessor};
use crate::error::ModelError;
use crate::timing::FrameTimingModel;

/// Floor applied to mel energies before the decibel conversion
const AMPLITUDE_FLOOR: f64 = 1e-10;

/// MFCC transform matching the STFT conventions of common speech front-ends
pub struct MfccTransform {
    n_mfcc: usize,
    n_fft: usize,
    hop_length: usize,
    center: bool,
    top_db: Option<f64>,
    spectrum: SpectrumProcessor,
    timing: FrameTimingModel,
    /// Shape (n_mels, n_fft / 2 + 1)
    filterbank: Array2<f64>,
    /// Shape (n_mfcc, n_mels)
    dct: Array2<f64>,
}

impl MfccTransform {
    /// Create a new MFCC transform
    ///
    /// # Arguments
    /// * `sample_rate` - Input sample rate in Hz
    /// * `n_mfcc` - Number of cepstral coefficients (<= n_mels)
    /// * `n_fft` - FFT size, also the analysis window length
    /// * `hop_length` - Samples between frames
    /// * `n_mels` - Number of mel filters spanning 0 Hz to Nyquist
    /// * `center` - Reflect-pad the input by n_fft / 2 on both sides
    /// * `top_db` - Dynamic range kept below the per-item maximum
    pub fn new(
        sample_rate: u32,
        n_mfcc: usize,
        n_fft: usize,
        hop_length: usize,
        n_mels: usize,
        center: bool,
        top_db: Option<f64>,
    ) -> Result<Self, ModelError> {
        if n_fft == 0 || hop_length == 0 || n_mels == 0 || sample_rate == 0 {
            return Err(ModelError::InvalidConfig {
                reason: format!(
                    "sample_rate ({}), n_fft ({}), hop_length ({}) and n_mels ({}) must be positive",
                    sample_rate, n_fft, hop_length, n_mels
                ),
            });
        }
        if n_mfcc == 0 || n_mfcc > n_mels {
            return Err(ModelError::InvalidConfig {
                reason: format!("n_mfcc ({}) must be in 1..={} (n_mels)", n_mfcc, n_mels),
            });
        }

        let timing = FrameTimingModel::new(hop_length, n_fft, center, sample_rate).map_err(
            |err| ModelError::InvalidConfig {
                reason: err.to_string(),
            },
        )?;
        let spectrum = SpectrumProcessor::new(n_fft, hann_window(n_fft, true));
        let filterbank = mel_filterbank(
            n_mels,
            spectrum.num_bins(),
            sample_rate,
            0.0,
            sample_rate as f64 / 2.0,
        );

        Ok(Self {
            n_mfcc,
            n_fft,
            hop_length,
            center,
            top_db,
            spectrum,
            timing,
            filterbank,
            dct: dct_basis(n_mfcc, n_mels),
        })
    }

    pub fn n_mfcc(&self) -> usize {
        self.n_mfcc
    }

    /// Smallest number of samples the transform accepts
    pub fn min_samples(&self) -> usize {
        if self.center {
            // Reflect padding needs more samples than the pad width
            self.n_fft / 2 + 1
        } else {
            self.n_fft
        }
    }

    /// Frame timing of the STFT (window n_fft, hop hop_length)
    pub fn timing(&self) -> &FrameTimingModel {
        &self.timing
    }

    /// Number of frames produced for `num_samples` input samples
    pub fn num_frames(&self, num_samples: usize) -> usize {
        self.timing.num_frames(num_samples)
    }

    /// Compute MFCCs of every channel of one item
    ///
    /// # Arguments
    /// * `item` - Waveform with shape (samples, channels)
    ///
    /// # Returns
    /// Coefficients with shape (channels, n_mfcc, frames)
    pub fn transform(&self, item: ArrayView2<f32>) -> Result<Array3<f32>, ModelError> {
        let (num_samples, num_channels) = item.dim();
        if num_samples < self.min_samples() {
            return Err(ModelError::InvalidInput {
                reason: format!(
                    "waveform has {} samples, at least {} are required",
                    num_samples,
                    self.min_samples()
                ),
            });
        }

        let mut mel_db: Vec<Array2<f64>> = item
            .axis_iter(Axis(1))
            .map(|channel| self.mel_decibels(channel))
            .collect();

        if let Some(top_db) = self.top_db {
            let peak = mel_db
                .iter()
                .flat_map(|spec| spec.iter().copied())
                .fold(f64::NEG_INFINITY, f64::max);
            let floor = peak - top_db;
            for spec in mel_db.iter_mut() {
                spec.mapv_inplace(|db| if db < floor { floor } else { db });
            }
        }

        let num_frames = self.num_frames(num_samples);
        let mut output = Array3::<f32>::zeros((num_channels, self.n_mfcc, num_frames));
        for (mut out, spec) in output.axis_iter_mut(Axis(0)).zip(mel_db.iter()) {
            let cepstra = self.dct.dot(spec);
            out.assign(&cepstra.mapv(|c| c as f32));
        }

        Ok(output)
    }

    /// Mel spectrogram in decibels with shape (n_mels, frames)
    fn mel_decibels(&self, channel: ArrayView1<f32>) -> Array2<f64> {
        let signal: Vec<f64> = channel.iter().map(|&s| s as f64).collect();
        let signal = if self.center {
            reflect_pad(&signal, self.n_fft / 2)
        } else {
            signal
        };

        let num_frames = self.num_frames(channel.len());
        let num_bins = self.spectrum.num_bins();
        let mut power = Array2::<f64>::zeros((num_bins, num_frames));
        for (t, mut column) in power.axis_iter_mut(Axis(1)).enumerate() {
            let start = t * self.hop_length;
            let frame = &signal[start..start + self.n_fft];
            for (bin, value) in self.spectrum.power_spectrum(frame).into_iter().enumerate() {
                column[bin] = value;
            }
        }

        self.filterbank.dot(&power).mapv(|energy| {
            let floored = if energy < AMPLITUDE_FLOOR {
                AMPLITUDE_FLOOR
            } else {
                energy
            };
            10.0 * floored.log10()
        })
    }
}

/// Mirror `pad` samples at both ends, excluding the edge sample itself
///
/// Requires `pad < signal.len()`.
fn reflect_pad(signal: &[f64], pad: usize) -> Vec<f64> {
    let n = signal.len();
    let mut padded = Vec::with_capacity(n + 2 * pad);
    padded.extend((1..=pad).rev().map(|i| signal[i]));
    padded.extend_from_slice(signal);
    padded.extend((1..=pad).map(|i| signal[n - 1 - i]));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> MfccTransform {
        MfccTransform::new(16000, 40, 400, 200, 128, true, Some(80.0)).unwrap()
    }

    fn sine(num_samples: usize, freq: f64) -> Vec<f32> {
        (0..num_samples)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / 16000.0).sin() as f32)
            .collect()
    }

    #[test]
    fn test_reflect_pad() {
        let padded = reflect_pad(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(padded, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_output_shape() {
        let waveform = Array2::from_shape_vec((16000, 1), sine(16000, 440.0)).unwrap();
        let mfcc = transform().transform(waveform.view()).unwrap();
        assert_eq!(mfcc.dim(), (1, 40, 81));
        assert!(mfcc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_non_centered_frames() {
        let mfcc = MfccTransform::new(16000, 13, 400, 200, 40, false, None).unwrap();
        assert_eq!(mfcc.num_frames(399), 0);
        assert_eq!(mfcc.num_frames(400), 1);
        assert_eq!(mfcc.num_frames(1000), 4);
        assert_eq!(mfcc.timing().window_length(), 400);
        assert!(!mfcc.timing().centered());
    }

    #[test]
    fn test_too_short_input_is_rejected() {
        let waveform = Array2::<f32>::zeros((200, 1));
        assert!(matches!(
            transform().transform(waveform.view()),
            Err(ModelError::InvalidInput { .. })
        ));

        let waveform = Array2::<f32>::zeros((201, 1));
        assert!(transform().transform(waveform.view()).is_ok());
    }

    #[test]
    fn test_silence_is_floored() {
        let waveform = Array2::<f32>::zeros((4000, 1));
        let mfcc = transform().transform(waveform.view()).unwrap();
        // Constant -100 dB across filters: only the DC cepstral term survives
        let c0 = mfcc[[0, 0, 0]];
        assert!((c0 as f64 - (-100.0 * 128f64.sqrt())).abs() < 1e-2);
        assert!(mfcc[[0, 1, 0]].abs() < 1e-3);
    }

    #[test]
    fn test_top_db_is_shared_across_channels() {
        let loud = sine(4000, 440.0);
        let mut interleaved = Vec::with_capacity(8000);
        for &s in &loud {
            interleaved.push(s);
            interleaved.push(0.0);
        }
        let waveform = Array2::from_shape_vec((4000, 2), interleaved).unwrap();
        let mfcc = transform().transform(waveform.view()).unwrap();

        // Silent channel is clamped to (peak - 80 dB), not to -100 dB
        let silent_c0 = mfcc[[1, 0, 5]] as f64 / 128f64.sqrt();
        assert!(silent_c0 > -100.0 + 1.0);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            MfccTransform::new(16000, 64, 400, 200, 40, true, None),
            Err(ModelError::InvalidConfig { .. })
        ));
        assert!(matches!(
            MfccTransform::new(16000, 13, 400, 0, 40, true, None),
            Err(ModelError::InvalidConfig { .. })
        ));
    }
}
