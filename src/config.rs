//! Configuration management for extraction and segmentation
//!
//! This module provides runtime configuration loading from JSON files,
//! so recipes and front-end parameters can be changed without
//! recompilation. Missing or invalid files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{FeatureError, ModelError};
use crate::features::recipe::{
    CompoundRecipe, FeatureRecipe, MfccRecipe, ZcrRecipe, DEFAULT_DURATION, DEFAULT_NUM_COEFS,
    DEFAULT_STEP,
};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

/// Legacy feature extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Recipe applied to every audio item
    pub recipe: RecipeConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            recipe: RecipeConfig::Mfcc {
                duration: DEFAULT_DURATION,
                step: DEFAULT_STEP,
                keep_energy: true,
                num_coefs: DEFAULT_NUM_COEFS,
                keep_delta_energy: false,
                add_delta: false,
                keep_delta2_energy: false,
                add_delta2: false,
            },
        }
    }
}

fn default_duration() -> f64 {
    DEFAULT_DURATION
}

fn default_step() -> f64 {
    DEFAULT_STEP
}

fn default_true() -> bool {
    true
}

fn default_num_coefs() -> usize {
    DEFAULT_NUM_COEFS
}

/// Serialized form of a feature recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecipeConfig {
    Zcr {
        #[serde(default = "default_duration")]
        duration: f64,
        #[serde(default = "default_step")]
        step: f64,
    },
    Mfcc {
        #[serde(default = "default_duration")]
        duration: f64,
        #[serde(default = "default_step")]
        step: f64,
        #[serde(default = "default_true")]
        keep_energy: bool,
        #[serde(default = "default_num_coefs")]
        num_coefs: usize,
        #[serde(default)]
        keep_delta_energy: bool,
        #[serde(default)]
        add_delta: bool,
        #[serde(default)]
        keep_delta2_energy: bool,
        #[serde(default)]
        add_delta2: bool,
    },
    Compound {
        children: Vec<RecipeConfig>,
    },
}

impl RecipeConfig {
    /// Build the recipe, validating timing and composition
    pub fn build(&self) -> Result<FeatureRecipe, FeatureError> {
        let recipe = match self {
            RecipeConfig::Zcr { duration, step } => ZcrRecipe::new(*duration, *step)?.into(),
            RecipeConfig::Mfcc {
                duration,
                step,
                keep_energy,
                num_coefs,
                keep_delta_energy,
                add_delta,
                keep_delta2_energy,
                add_delta2,
            } => MfccRecipe::new(*duration, *step)?
                .with_energy(*keep_energy)
                .with_coefs(*num_coefs)
                .with_delta(*add_delta, *keep_delta_energy)
                .with_delta2(*add_delta2, *keep_delta2_energy)
                .into(),
            RecipeConfig::Compound { children } => {
                let children = children
                    .iter()
                    .map(RecipeConfig::build)
                    .collect::<Result<Vec<_>, _>>()?;
                CompoundRecipe::from_children(children)?.into()
            }
        };
        Ok(recipe)
    }
}

/// Neural segmentation front-end and initialization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Expected input sample rate in Hz
    pub sample_rate: u32,
    /// Expected number of input channels
    pub num_channels: usize,
    /// Number of MFCC coefficients per channel
    pub n_mfcc: usize,
    /// FFT size in samples
    pub n_fft: usize,
    /// Analysis window length in samples (must equal n_fft)
    pub win_length: usize,
    /// Samples between consecutive frames
    pub hop_length: usize,
    /// Number of mel filters
    pub n_mels: usize,
    /// Reflect-pad the input so frames are centered on their timestamp
    pub center: bool,
    /// Dynamic range (dB) kept below the per-item maximum
    pub top_db: Option<f64>,
    /// Seed of the weight initialization
    pub seed: u64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            num_channels: 1,
            n_mfcc: 40,
            n_fft: 400,
            win_length: 400,
            hop_length: 200,
            n_mels: 128,
            center: true,
            top_db: Some(80.0),
            seed: 0,
        }
    }
}

impl SegmentationConfig {
    /// Check parameters that the MFCC front-end cannot check on its own
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_channels == 0 {
            return Err(ModelError::InvalidConfig {
                reason: "num_channels must be positive".to_string(),
            });
        }
        if self.win_length != self.n_fft {
            return Err(ModelError::InvalidConfig {
                reason: format!(
                    "win_length ({}) must equal n_fft ({})",
                    self.win_length, self.n_fft
                ),
            });
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or the default one if the file doesn't exist
    /// or its JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
