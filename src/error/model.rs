// Segmentation model error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Model error code constants
///
/// Error code range: 4001-4004
pub struct ModelErrorCodes {}

impl ModelErrorCodes {
    /// Model was configured against a multi-task specification
    pub const MULTI_TASK_UNSUPPORTED: i32 = 4001;

    /// Model hyper-parameters are inconsistent
    pub const INVALID_CONFIG: i32 = 4002;

    /// Forward input has the wrong shape
    pub const INVALID_INPUT: i32 = 4003;

    /// Loaded parameters do not match the expected shapes
    pub const INVALID_PARAMETERS: i32 = 4004;
}

/// Log a model error with structured context
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        "Model error in {}: code={}, component=SimpleSegmentation, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Neural segmentation errors
///
/// Error code range: 4001-4004
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Model was configured against a multi-task specification
    MultiTaskUnsupported { num_tasks: usize },

    /// Model hyper-parameters are inconsistent
    InvalidConfig { reason: String },

    /// Forward input has the wrong shape
    InvalidInput { reason: String },

    /// Loaded parameters do not match the expected shapes
    InvalidParameters {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::MultiTaskUnsupported { .. } => ModelErrorCodes::MULTI_TASK_UNSUPPORTED,
            ModelError::InvalidConfig { .. } => ModelErrorCodes::INVALID_CONFIG,
            ModelError::InvalidInput { .. } => ModelErrorCodes::INVALID_INPUT,
            ModelError::InvalidParameters { .. } => ModelErrorCodes::INVALID_PARAMETERS,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::MultiTaskUnsupported { num_tasks } => format!(
                "SimpleSegmentation does not support multi-tasking (got {} tasks)",
                num_tasks
            ),
            ModelError::InvalidConfig { reason } => format!("Invalid model config: {}", reason),
            ModelError::InvalidInput { reason } => format!("Invalid model input: {}", reason),
            ModelError::InvalidParameters {
                name,
                expected,
                found,
            } => format!(
                "Parameter '{}' has shape {:?}, expected {:?}",
                name, found, expected
            ),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ModelError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ModelError {}
