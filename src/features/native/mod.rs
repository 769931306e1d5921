// NativeEngine - in-process implementation of the feature engine seam
//
// Understands the instruction grammar emitted by the recipes (see plan.rs)
// and computes every block on the same frame layout:
//
// - frame i is centered on sample i * stepSize
// - the window spans blockSize samples, zero-padded outside the signal
// - a signal of N samples yields ceil(N / stepSize) frames
//
// This matches the centered FrameGrid(-duration/2, duration, step) the
// extractor attaches to its output.
//
// MFCC pipeline per frame: Hann window -> |FFT| -> mel filterbank -> ln -> DCT-II,
// then columns [CepsIgnoreFirstCoeff, CepsIgnoreFirstCoeff + CepsNbCoeffs).

mod plan;
mod temporal;

pub use plan::{parse, FeatureKind, FeatureSpec, MfccSpec};
pub use temporal::zero_crossing_rate;

use std::collections::HashSet;

use log::debug;
use ndarray::{s, Array2, ArrayView1, ArrayView2};

use super::engine::{FeatureBlocks, FeatureEngine};
use super::recipe::{Instruction, SampleRate};
use crate::dsp::{dct_basis, deltas, hann_window, mel_filterbank, SpectrumProcessor};
use crate::error::{ErrorCode, FeatureError};

/// Floor applied to mel energies before the logarithm
const LOG_FLOOR: f64 = 1e-10;

/// In-process feature engine (ZCR, MFCC, derivatives)
#[derive(Default)]
pub struct NativeEngine {
    sample_rate: Option<SampleRate>,
    plan: Vec<PlannedFeature>,
}

struct PlannedFeature {
    name: String,
    spec: FeatureSpec,
    computer: Computer,
}

enum Computer {
    Zcr,
    Mfcc(MfccComputer),
}

struct MfccComputer {
    spectrum: SpectrumProcessor,
    filterbank: Array2<f64>,
    dct: Array2<f64>,
    ignore_first: usize,
}

impl MfccComputer {
    fn new(spec: &MfccSpec, block_size: usize, sample_rate: SampleRate) -> Self {
        let fft_size = block_size.next_power_of_two();
        let spectrum = SpectrumProcessor::new(fft_size, hann_window(block_size, false));
        let filterbank = mel_filterbank(
            spec.num_filters,
            spectrum.num_bins(),
            sample_rate.hz(),
            spec.min_freq,
            spec.max_freq,
        );
        let dct = dct_basis(spec.ignore_first + spec.num_coeffs, spec.num_filters);

        Self {
            spectrum,
            filterbank,
            dct,
            ignore_first: spec.ignore_first,
        }
    }

    fn compute(&self, frame: &[f64]) -> Vec<f64> {
        let magnitude = ndarray::Array1::from(self.spectrum.magnitude_spectrum(frame));

        // NaN must survive the floor so corrupted input stays visible downstream
        let log_mel = self
            .filterbank
            .dot(&magnitude)
            .mapv(|energy| {
                let floored = if energy < LOG_FLOOR { LOG_FLOOR } else { energy };
                floored.ln()
            });

        self.dct.dot(&log_mel).iter().skip(self.ignore_first).copied().collect()
    }
}

impl NativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample rate of the current configuration
    pub fn sample_rate(&self) -> Option<SampleRate> {
        self.sample_rate
    }

    /// Names of the configured features, in configuration order
    pub fn feature_names(&self) -> Vec<&str> {
        self.plan.iter().map(|feature| feature.name.as_str()).collect()
    }

    fn compute(&self, feature: &PlannedFeature, signal: ArrayView1<f64>) -> Array2<f64> {
        let spec = &feature.spec;
        let num_frames = signal.len().div_ceil(spec.step_size);
        let mut block = Array2::<f64>::zeros((num_frames, spec.dimension()));
        let mut frame = vec![0.0; spec.block_size];

        for i in 0..num_frames {
            fill_frame(
                &mut frame,
                signal,
                (i * spec.step_size) as isize - (spec.block_size / 2) as isize,
            );

            match &feature.computer {
                Computer::Zcr => block[[i, 0]] = zero_crossing_rate(&frame),
                Computer::Mfcc(mfcc) => {
                    let cepstrum = mfcc.compute(&frame);
                    block
                        .slice_mut(s![i, ..])
                        .iter_mut()
                        .zip(cepstrum)
                        .for_each(|(dst, src)| *dst = src);
                }
            }
        }

        for _ in 0..spec.derivative_order {
            block = deltas(block.view());
        }

        block
    }
}

/// Copy the window starting at `start` (may be negative) into `frame`,
/// zero-padding whatever falls outside the signal
fn fill_frame(frame: &mut [f64], signal: ArrayView1<f64>, start: isize) {
    let len = signal.len() as isize;
    for (offset, slot) in frame.iter_mut().enumerate() {
        let index = start + offset as isize;
        *slot = if index >= 0 && index < len {
            signal[index as usize]
        } else {
            0.0
        };
    }
}

impl FeatureEngine for NativeEngine {
    fn configure(
        &mut self,
        sample_rate: SampleRate,
        instructions: &[Instruction],
    ) -> Result<(), FeatureError> {
        // Never keep a half-built plan around
        self.sample_rate = None;
        self.plan.clear();

        let mut names = HashSet::new();
        let mut plan = Vec::with_capacity(instructions.len());

        for instruction in instructions {
            let rejected = |reason: String| FeatureError::FeaturePlan {
                name: instruction.name.clone(),
                reason,
            };

            if !names.insert(instruction.name.as_str()) {
                return Err(rejected("feature name already registered".to_string()));
            }

            let spec = parse(&instruction.parameters).map_err(|err| rejected(err.message()))?;
            let computer = match &spec.kind {
                FeatureKind::Zcr => Computer::Zcr,
                FeatureKind::Mfcc(mfcc) => {
                    Computer::Mfcc(MfccComputer::new(mfcc, spec.block_size, sample_rate))
                }
            };

            debug!("[NativeEngine] registered {} at {}", instruction, sample_rate);
            plan.push(PlannedFeature {
                name: instruction.name.clone(),
                spec,
                computer,
            });
        }

        self.plan = plan;
        self.sample_rate = Some(sample_rate);
        Ok(())
    }

    fn process(&mut self, samples: ArrayView2<f64>) -> Result<FeatureBlocks, FeatureError> {
        if self.sample_rate.is_none() {
            return Err(FeatureError::Engine {
                reason: "engine used before configuration".to_string(),
            });
        }
        if samples.nrows() != 1 {
            return Err(FeatureError::Engine {
                reason: format!("expected a (1, N) signal, got {:?}", samples.dim()),
            });
        }

        let signal = samples.row(0);
        Ok(self
            .plan
            .iter()
            .map(|feature| (feature.name.clone(), self.compute(feature, signal)))
            .collect())
    }

    fn frame_count(&self, num_samples: usize) -> Option<usize> {
        let step = self.plan.first()?.spec.step_size;
        Some(num_samples.div_ceil(step))
    }
}
