// Framewise - frame-level audio features and segmentation scores
// Recipe-driven feature extraction and a small neural segmentation forward path

// Module declarations
pub mod config;
pub mod dsp;
pub mod error;
pub mod features;
pub mod model;
pub mod telemetry;
pub mod timing;

// Re-exports for convenience
pub use config::{AppConfig, ExtractionConfig, RecipeConfig, SegmentationConfig};
pub use error::{ErrorCode, FeatureError, ModelError};
pub use features::{
    AudioBuffer, AudioItem, AudioReader, CompoundRecipe, FeatureEngine, FeatureRecipe,
    LegacyFeatureExtractor, MfccRecipe, NativeEngine, SampleRate, TimedFeatureMatrix, WavReader,
    ZcrRecipe,
};
pub use model::{SimpleSegmentation, Specifications, TaskSpecification};
pub use timing::{FrameGrid, FrameTimingModel};

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber honouring `RUST_LOG` (default `info`)
///
/// `log` records emitted by the library are bridged into the subscriber.
/// Calling this more than once is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
