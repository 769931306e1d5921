// Error types for the framewise crate
//
// This module defines custom error types for feature extraction and the
// segmentation model, providing structured error handling with numeric codes
// suitable for reporting across process boundaries (CLI exit codes, logs).

mod feature;
mod model;

pub use feature::{log_feature_error, FeatureError, FeatureErrorCodes};
pub use model::{log_model_error, ModelError, ModelErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the legacy extraction and neural segmentation paths.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
