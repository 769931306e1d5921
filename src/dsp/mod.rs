// DSP module - numeric building blocks shared by both feature paths
//
// Module organization:
// - fft: windowed FFT computation (magnitude / power spectra)
// - mel: mel scale conversion and triangular filterbanks
// - cepstral: DCT-II basis and regression derivatives
//
// Everything here works on f64 and has no notion of frames or recipes.

pub mod cepstral;
pub mod fft;
pub mod mel;

pub use cepstral::{dct_basis, deltas};
pub use fft::{hann_window, SpectrumProcessor};
pub use mel::{hz_to_mel, mel_filterbank, mel_to_hz};
