//! Diagnostics collector and helpers.
//!
//! Recoverable conditions (e.g. non-finite extracted features) are reported as
//! [`DiagnosticEvent`]s through a [`DiagnosticSink`] instead of failing the
//! call. The collector logs every event and keeps a bounded history that
//! callers (CLI, tests) can snapshot.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::{info, warn};
use once_cell::sync::Lazy;

pub mod events;

pub use events::{DiagnosticEvent, Severity};

/// Global telemetry collector shared across the crate.
static HUB: Lazy<TelemetryCollector> = Lazy::new(TelemetryCollector::default);

/// Access the global telemetry collector.
pub fn hub() -> &'static TelemetryCollector {
    &HUB
}

/// Observability collaborator receiving diagnostic events.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<S> {
    fn emit(&self, event: DiagnosticEvent) {
        (**self).emit(event)
    }
}

impl DiagnosticSink for &'static TelemetryCollector {
    fn emit(&self, event: DiagnosticEvent) {
        (**self).emit(event)
    }
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<DiagnosticEvent>,
    pub total_events: u64,
    pub warnings: u64,
    pub dropped_events: u64,
}

/// Collector retaining a bounded history of diagnostic events.
pub struct TelemetryCollector {
    history: Mutex<VecDeque<DiagnosticEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    warnings: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: DiagnosticEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        match event.severity() {
            Severity::Warning => warn!("[Telemetry] {}", event),
            Severity::Info => info!("[Telemetry] {}", event),
        }

        if event.severity() == Severity::Warning {
            self.warnings.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut history) = self.history.lock() {
            if self.history_capacity == 0 {
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
                return;
            }
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event);
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let recent = self
            .history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default();

        TelemetrySnapshot {
            recent,
            total_events: self.total_events.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }

    /// Warning events currently held in the history.
    pub fn recent_warnings(&self) -> Vec<DiagnosticEvent> {
        self.snapshot()
            .recent
            .into_iter()
            .filter(|event| event.severity() == Severity::Warning)
            .collect()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(64)
    }
}

impl DiagnosticSink for TelemetryCollector {
    fn emit(&self, event: DiagnosticEvent) {
        self.publish(event);
    }
}
