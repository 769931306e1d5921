// LegacyFeatureExtractor - recipe-driven feature extraction
//
// Pipeline for one item:
// 1. Load audio through the AudioReader
// 2. (Re)configure the engine if the sample rate changed
// 3. Select the 1-based channel and shape it as a (1, N) f64 signal
// 4. Run the engine and concatenate blocks in recipe declaration order
// 5. Report non-finite values as a diagnostic (data returned unchanged)
// 6. Attach the centered FrameGrid(-duration/2, duration, step)
//
// The engine configuration is the only mutable state. It is keyed by sample
// rate and rebuilt from the recipe whenever a different rate is observed.
// Callers needing concurrency use one extractor per thread.

use log::{debug, info};
use ndarray::{concatenate, Array2, Axis};

use super::audio::{AudioItem, AudioReader};
use super::engine::FeatureEngine;
use super::recipe::{FeatureRecipe, SampleRate};
use super::TimedFeatureMatrix;
use crate::error::{log_feature_error, FeatureError};
use crate::telemetry::{hub, DiagnosticEvent, DiagnosticSink};
use crate::timing::FrameGrid;

/// Drives a [`FeatureEngine`] from a [`FeatureRecipe`]
pub struct LegacyFeatureExtractor<E, R> {
    recipe: FeatureRecipe,
    grid: FrameGrid,
    engine: E,
    reader: R,
    sink: Box<dyn DiagnosticSink>,
    configured: Option<SampleRate>,
}

impl<E: FeatureEngine, R: AudioReader> LegacyFeatureExtractor<E, R> {
    /// Create an extractor reporting diagnostics to the global hub
    ///
    /// # Arguments
    /// * `recipe` - Features to extract
    /// * `engine` - DSP engine computing the recipe's instructions
    /// * `reader` - Audio loading collaborator
    pub fn new(recipe: FeatureRecipe, engine: E, reader: R) -> Result<Self, FeatureError> {
        Self::with_sink(recipe, engine, reader, Box::new(hub()))
    }

    /// Create an extractor reporting diagnostics to `sink`
    pub fn with_sink(
        recipe: FeatureRecipe,
        engine: E,
        reader: R,
        sink: Box<dyn DiagnosticSink>,
    ) -> Result<Self, FeatureError> {
        let grid = recipe.grid()?;
        Ok(Self {
            recipe,
            grid,
            engine,
            reader,
            sink,
            configured: None,
        })
    }

    pub fn recipe(&self) -> &FeatureRecipe {
        &self.recipe
    }

    /// Number of columns of every extracted matrix
    pub fn dimension(&self) -> usize {
        self.recipe.dimension()
    }

    /// Timing of the rows of every extracted matrix
    pub fn grid(&self) -> &FrameGrid {
        &self.grid
    }

    /// Sample rate the engine is currently configured for
    pub fn configured_sample_rate(&self) -> Option<SampleRate> {
        self.configured
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Extract features from one audio item
    ///
    /// # Errors
    /// * `AudioLoad` - the reader failed
    /// * `FeaturePlan` - the engine rejected an instruction
    /// * `ChannelOutOfRange` - the requested channel does not exist
    /// * `Engine` - the engine failed, or returned missing or mis-sized blocks
    pub fn extract(&mut self, item: &AudioItem) -> Result<TimedFeatureMatrix, FeatureError> {
        let audio = self
            .reader
            .read(&item.path)
            .map_err(|err| {
                let err = FeatureError::AudioLoad {
                    source: item.identifier(),
                    reason: err.to_string(),
                };
                log_feature_error(&err, "LegacyFeatureExtractor::extract");
                err
            })?;

        let sample_rate = SampleRate::new(audio.sample_rate)?;
        self.ensure_configured(sample_rate)?;

        let signal = audio.channel(item.channel())?;
        let num_samples = signal.len();
        let samples = signal.insert_axis(Axis(0));

        let mut blocks = self.engine.process(samples.view())?;

        // Recipe order, not engine order: consumers index columns by position
        let mut ordered = Vec::new();
        for (name, columns) in self.recipe.blocks() {
            let block = blocks.remove(name).ok_or_else(|| FeatureError::Engine {
                reason: format!("engine returned no '{}' block", name),
            })?;
            if block.ncols() != columns {
                let err = FeatureError::Engine {
                    reason: format!(
                        "'{}' block has {} column(s), recipe declares {}",
                        name,
                        block.ncols(),
                        columns
                    ),
                };
                log_feature_error(&err, "LegacyFeatureExtractor::extract");
                return Err(err);
            }
            ordered.push(block);
        }

        let data = concatenate_columns(&ordered)?;
        debug!(
            "[Extractor] {}: {} samples @ {} -> {:?}",
            item.identifier(),
            num_samples,
            sample_rate,
            data.dim()
        );

        let non_finite_values = data.iter().filter(|v| !v.is_finite()).count();
        if non_finite_values > 0 {
            self.sink.emit(DiagnosticEvent::NonFiniteFeatures {
                source: item.identifier(),
                non_finite_values,
                total_values: data.len(),
            });
        }

        Ok(TimedFeatureMatrix::new(data, self.grid))
    }

    fn ensure_configured(&mut self, sample_rate: SampleRate) -> Result<(), FeatureError> {
        if self.configured == Some(sample_rate) {
            return Ok(());
        }

        // Stays None on failure so the next call retries from scratch
        self.configured = None;
        let instructions = self.recipe.instructions(sample_rate);
        self.engine
            .configure(sample_rate, &instructions)
            .map_err(|err| {
                log_feature_error(&err, "LegacyFeatureExtractor::configure");
                err
            })?;
        self.configured = Some(sample_rate);

        info!(
            "[Extractor] Engine configured for {} with {} feature(s)",
            sample_rate,
            instructions.len()
        );
        self.sink.emit(DiagnosticEvent::EngineConfigured {
            sample_rate: sample_rate.hz(),
            features: instructions.into_iter().map(|i| i.name).collect(),
        });

        Ok(())
    }
}

/// Horizontally stack blocks that share a row count
fn concatenate_columns(blocks: &[Array2<f64>]) -> Result<Array2<f64>, FeatureError> {
    let Some(first) = blocks.first() else {
        return Ok(Array2::zeros((0, 0)));
    };

    if let Some(mismatch) = blocks.iter().find(|b| b.nrows() != first.nrows()) {
        return Err(FeatureError::Engine {
            reason: format!(
                "feature blocks disagree on frame count ({} vs {})",
                first.nrows(),
                mismatch.nrows()
            ),
        });
    }

    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(1), &views).map_err(|err| FeatureError::Engine {
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::audio::{AudioBuffer, MemoryReader};
    use crate::features::engine::FeatureBlocks;
    use crate::features::recipe::{CompoundRecipe, Instruction, MfccRecipe, ZcrRecipe};
    use crate::telemetry::TelemetryCollector;
    use ndarray::ArrayView2;
    use std::sync::Arc;

    /// Engine returning constant blocks sized from the instructions
    #[derive(Default)]
    struct StubEngine {
        configurations: Vec<(u32, Vec<Instruction>)>,
        reject: Option<String>,
        fill: f64,
        reversed: bool,
        /// Forces the column count of every MFCC block
        mfcc_columns: Option<usize>,
    }

    fn declared_columns(instruction: &Instruction) -> usize {
        instruction
            .parameters
            .split_whitespace()
            .find_map(|token| token.strip_prefix("CepsNbCoeffs="))
            .and_then(|value| value.parse().ok())
            .unwrap_or(1)
    }

    impl FeatureEngine for StubEngine {
        fn configure(
            &mut self,
            sample_rate: SampleRate,
            instructions: &[Instruction],
        ) -> Result<(), FeatureError> {
            if let Some(name) = &self.reject {
                if instructions.iter().any(|i| &i.name == name) {
                    return Err(FeatureError::FeaturePlan {
                        name: name.clone(),
                        reason: "rejected".to_string(),
                    });
                }
            }
            self.configurations
                .push((sample_rate.hz(), instructions.to_vec()));
            Ok(())
        }

        fn process(&mut self, samples: ArrayView2<f64>) -> Result<FeatureBlocks, FeatureError> {
            let frames = samples.ncols().div_ceil(160);
            let (_, instructions) = self.configurations.last().cloned().unwrap_or_default();
            Ok(instructions
                .iter()
                .enumerate()
                .map(|(k, instruction)| {
                    let dim = match self.mfcc_columns {
                        Some(columns) if instruction.name.starts_with("mfcc") => columns,
                        _ => declared_columns(instruction),
                    };
                    let value = if self.reversed { -(k as f64) } else { k as f64 };
                    (
                        instruction.name.clone(),
                        Array2::from_elem((frames, dim), value + self.fill),
                    )
                })
                .collect())
        }
    }

    fn reader_with(path: &str, buffer: AudioBuffer) -> MemoryReader {
        let mut reader = MemoryReader::new();
        reader.insert(path, buffer);
        reader
    }

    fn mono(num_samples: usize, sample_rate: u32) -> AudioBuffer {
        AudioBuffer::mono(vec![0.25; num_samples], sample_rate)
    }

    #[test]
    fn test_grid_is_centered_on_frames() {
        let extractor = LegacyFeatureExtractor::new(
            ZcrRecipe::default().into(),
            StubEngine::default(),
            MemoryReader::new(),
        )
        .unwrap();
        assert_eq!(extractor.grid().start(), -0.0125);
        assert_eq!(extractor.grid().duration(), 0.025);
        assert_eq!(extractor.grid().step(), 0.010);
        assert_eq!(extractor.dimension(), 1);
    }

    #[test]
    fn test_reconfigures_only_on_sample_rate_change() {
        let mut reader = reader_with("a.wav", mono(16000, 16000));
        reader.insert("b.wav", mono(16000, 16000));
        reader.insert("c.wav", mono(8000, 8000));

        let mut extractor =
            LegacyFeatureExtractor::new(ZcrRecipe::default().into(), StubEngine::default(), reader)
                .unwrap();

        extractor.extract(&AudioItem::new("a.wav")).unwrap();
        extractor.extract(&AudioItem::new("b.wav")).unwrap();
        extractor.extract(&AudioItem::new("c.wav")).unwrap();
        extractor.extract(&AudioItem::new("a.wav")).unwrap();

        let rates: Vec<u32> = extractor
            .engine()
            .configurations
            .iter()
            .map(|(rate, _)| *rate)
            .collect();
        assert_eq!(rates, vec![16000, 8000, 16000]);
        assert_eq!(
            extractor.engine().configurations[1].1[0].parameters,
            "ZCR blockSize=200 stepSize=80"
        );
    }

    #[test]
    fn test_columns_follow_recipe_order() {
        let recipe = CompoundRecipe::from_children(vec![
            ZcrRecipe::default().into(),
            MfccRecipe::default().into(),
        ])
        .unwrap();
        let engine = StubEngine {
            reversed: true,
            ..StubEngine::default()
        };
        let mut extractor =
            LegacyFeatureExtractor::new(recipe.into(), engine, reader_with("a.wav", mono(1600, 16000)))
                .unwrap();

        let features = extractor.extract(&AudioItem::new("a.wav")).unwrap();
        assert_eq!(features.data().dim(), (10, 13));
        assert_eq!(features.dimension(), extractor.dimension());
        assert_eq!(features.data()[[0, 0]], 0.0);
        assert_eq!(features.data()[[0, 1]], -1.0);
        assert_eq!(features.data()[[0, 12]], -1.0);
    }

    #[test]
    fn test_block_width_must_match_recipe() {
        let engine = StubEngine {
            mfcc_columns: Some(2),
            ..StubEngine::default()
        };
        let mut extractor = LegacyFeatureExtractor::new(
            MfccRecipe::default().into(),
            engine,
            reader_with("a.wav", mono(1600, 16000)),
        )
        .unwrap();
        assert_eq!(extractor.dimension(), 12);

        let err = extractor.extract(&AudioItem::new("a.wav")).unwrap_err();
        match err {
            FeatureError::Engine { reason } => {
                assert!(reason.contains("'mfcc'"));
                assert!(reason.contains("2 column(s)"));
            }
            other => panic!("Expected Engine, got {:?}", other),
        }
    }

    #[test]
    fn test_rejected_instruction_is_fatal_and_retried() {
        let engine = StubEngine {
            reject: Some("zcr".to_string()),
            ..StubEngine::default()
        };
        let mut extractor = LegacyFeatureExtractor::new(
            ZcrRecipe::default().into(),
            engine,
            reader_with("a.wav", mono(1600, 16000)),
        )
        .unwrap();

        for _ in 0..2 {
            let err = extractor.extract(&AudioItem::new("a.wav")).unwrap_err();
            assert!(matches!(err, FeatureError::FeaturePlan { .. }));
            assert!(extractor.configured_sample_rate().is_none());
        }
    }

    #[test]
    fn test_missing_audio_is_audio_load_error() {
        let mut extractor = LegacyFeatureExtractor::new(
            ZcrRecipe::default().into(),
            StubEngine::default(),
            MemoryReader::new(),
        )
        .unwrap();

        let err = extractor
            .extract(&AudioItem::new("missing.wav").with_uri("corpus/missing"))
            .unwrap_err();
        match err {
            FeatureError::AudioLoad { source, .. } => assert_eq!(source, "corpus/missing"),
            other => panic!("Expected AudioLoad, got {:?}", other),
        }
    }

    #[test]
    fn test_channel_out_of_range_on_mono() {
        let mut extractor = LegacyFeatureExtractor::new(
            ZcrRecipe::default().into(),
            StubEngine::default(),
            reader_with("a.wav", mono(1600, 16000)),
        )
        .unwrap();

        let err = extractor
            .extract(&AudioItem::new("a.wav").with_channel(2))
            .unwrap_err();
        assert_eq!(
            err,
            FeatureError::ChannelOutOfRange {
                channel: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_nan_emits_single_warning() {
        let sink = Arc::new(TelemetryCollector::new(16));
        let engine = StubEngine {
            fill: f64::NAN,
            ..StubEngine::default()
        };
        let mut extractor = LegacyFeatureExtractor::with_sink(
            ZcrRecipe::default().into(),
            engine,
            reader_with("a.wav", mono(1600, 16000)),
            Box::new(Arc::clone(&sink)),
        )
        .unwrap();

        let features = extractor
            .extract(&AudioItem::new("a.wav").with_uri("corpus/a"))
            .unwrap();

        assert!(features.data().iter().all(|v| v.is_nan()));
        let warnings = sink.recent_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].source(), Some("corpus/a"));
    }

    #[test]
    fn test_concatenate_rejects_ragged_blocks() {
        let blocks = vec![Array2::<f64>::zeros((3, 1)), Array2::<f64>::zeros((4, 2))];
        assert!(concatenate_columns(&blocks).is_err());
        assert_eq!(concatenate_columns(&[]).unwrap().dim(), (0, 0));
    }
}
