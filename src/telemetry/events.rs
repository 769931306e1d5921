//! Diagnostic event types emitted by the feature and segmentation pipelines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity attached to every diagnostic event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// Structured diagnostic events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// Extracted features contain NaN or infinite values; data returned as-is.
    NonFiniteFeatures {
        source: String,
        non_finite_values: usize,
        total_values: usize,
    },
    /// Engine (re)configured after observing a new sample rate.
    EngineConfigured {
        sample_rate: u32,
        features: Vec<String>,
    },
}

impl DiagnosticEvent {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticEvent::NonFiniteFeatures { .. } => Severity::Warning,
            DiagnosticEvent::EngineConfigured { .. } => Severity::Info,
        }
    }

    /// Source identifier the event refers to, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            DiagnosticEvent::NonFiniteFeatures { source, .. } => Some(source),
            DiagnosticEvent::EngineConfigured { .. } => None,
        }
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEvent::NonFiniteFeatures {
                source,
                non_finite_values,
                total_values,
            } => write!(
                f,
                "Features extracted from \"{}\" contain non-finite values ({} of {} values)",
                source, non_finite_values, total_values
            ),
            DiagnosticEvent::EngineConfigured {
                sample_rate,
                features,
            } => write!(
                f,
                "Engine configured for {} Hz with [{}]",
                sample_rate,
                features.join(", ")
            ),
        }
    }
}
