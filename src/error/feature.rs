// Feature extraction error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Feature error code constants
///
/// Single source of truth for the numeric codes reported by [`FeatureError`].
///
/// Error code range: 3001-3010
pub struct FeatureErrorCodes {}

impl FeatureErrorCodes {
    /// Audio source could not be read
    pub const AUDIO_LOAD: i32 = 3001;

    /// Engine rejected a feature instruction
    pub const FEATURE_PLAN: i32 = 3002;

    /// Requested channel does not exist in the signal
    pub const CHANNEL_OUT_OF_RANGE: i32 = 3003;

    /// Frame grid duration/step are not strictly positive
    pub const INVALID_FRAME_GRID: i32 = 3004;

    /// Compound children disagree on (duration, step)
    pub const INCOMPATIBLE_RECIPES: i32 = 3005;

    /// Two recipes emit the same feature name
    pub const DUPLICATE_FEATURE_NAME: i32 = 3006;

    /// Sample rate is zero
    pub const INVALID_SAMPLE_RATE: i32 = 3007;

    /// Engine failed while processing samples
    pub const ENGINE: i32 = 3008;

    /// Instruction parameter string could not be parsed
    pub const INVALID_PARAMETERS: i32 = 3009;

    /// Compound recipe has no children
    pub const EMPTY_COMPOUND: i32 = 3010;
}

/// Log a feature error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_feature_error(err: &FeatureError, context: &str) {
    error!(
        "Feature error in {}: code={}, component=FeatureExtractor, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Feature extraction errors
///
/// These errors cover recipe construction, engine configuration, audio
/// loading and channel selection on the legacy extraction path.
///
/// Error code range: 3001-3010
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// Audio source could not be read
    AudioLoad { source: String, reason: String },

    /// Engine rejected a feature instruction
    FeaturePlan { name: String, reason: String },

    /// Requested 1-based channel does not exist
    ChannelOutOfRange { channel: usize, available: usize },

    /// Frame grid parameters are invalid
    InvalidFrameGrid { duration: f64, step: f64 },

    /// Compound children disagree on (duration, step)
    IncompatibleRecipes {
        expected: (f64, f64),
        found: (f64, f64),
    },

    /// Two recipes emit the same feature name
    DuplicateFeatureName { name: String },

    /// Sample rate is zero
    InvalidSampleRate { sample_rate: u32 },

    /// Engine failed while processing samples
    Engine { reason: String },

    /// Instruction parameter string could not be parsed
    InvalidParameters { parameters: String, reason: String },

    /// Compound recipe was given no children
    EmptyCompound,
}

impl ErrorCode for FeatureError {
    fn code(&self) -> i32 {
        match self {
            FeatureError::AudioLoad { .. } => FeatureErrorCodes::AUDIO_LOAD,
            FeatureError::FeaturePlan { .. } => FeatureErrorCodes::FEATURE_PLAN,
            FeatureError::ChannelOutOfRange { .. } => FeatureErrorCodes::CHANNEL_OUT_OF_RANGE,
            FeatureError::InvalidFrameGrid { .. } => FeatureErrorCodes::INVALID_FRAME_GRID,
            FeatureError::IncompatibleRecipes { .. } => FeatureErrorCodes::INCOMPATIBLE_RECIPES,
            FeatureError::DuplicateFeatureName { .. } => FeatureErrorCodes::DUPLICATE_FEATURE_NAME,
            FeatureError::InvalidSampleRate { .. } => FeatureErrorCodes::INVALID_SAMPLE_RATE,
            FeatureError::Engine { .. } => FeatureErrorCodes::ENGINE,
            FeatureError::InvalidParameters { .. } => FeatureErrorCodes::INVALID_PARAMETERS,
            FeatureError::EmptyCompound => FeatureErrorCodes::EMPTY_COMPOUND,
        }
    }

    fn message(&self) -> String {
        match self {
            FeatureError::AudioLoad { source, reason } => {
                format!("Failed to load audio from {}: {}", source, reason)
            }
            FeatureError::FeaturePlan { name, reason } => {
                format!("Engine rejected feature '{}': {}", name, reason)
            }
            FeatureError::ChannelOutOfRange { channel, available } => {
                format!(
                    "Channel {} out of range (signal has {} channel(s), channels are 1-based)",
                    channel, available
                )
            }
            FeatureError::InvalidFrameGrid { duration, step } => {
                format!(
                    "Frame duration and step must be finite and > 0 (got duration={}, step={})",
                    duration, step
                )
            }
            FeatureError::IncompatibleRecipes { expected, found } => {
                format!(
                    "Compound recipes must share (duration, step): expected {:?}, found {:?}",
                    expected, found
                )
            }
            FeatureError::DuplicateFeatureName { name } => {
                format!("Feature name '{}' is emitted more than once", name)
            }
            FeatureError::InvalidSampleRate { sample_rate } => {
                format!("Sample rate must be greater than 0 (got {})", sample_rate)
            }
            FeatureError::Engine { reason } => format!("Feature engine failure: {}", reason),
            FeatureError::InvalidParameters { parameters, reason } => {
                format!("Invalid feature parameters '{}': {}", parameters, reason)
            }
            FeatureError::EmptyCompound => {
                "Compound recipe needs at least one child recipe".to_string()
            }
        }
    }
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FeatureError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for FeatureError {}
