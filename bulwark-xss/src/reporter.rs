//! Detection sinks.
//!
//! The module reports every detected request to a [`DetectionSink`]. The
//! default [`TracingSink`] emits a structured `warn!` record; [`MemorySink`]
//! keeps events for tests or for forwarding elsewhere.

use crate::config::Mode;
use crate::result::DetectionResult;
use parking_lot::Mutex;
use tracing::warn;

/// One detected request.
#[derive(Debug, Clone, Copy)]
pub struct DetectionEvent<'a> {
    pub module: &'a str,
    pub path: &'a str,
    pub mode: Mode,
    pub result: &'a DetectionResult,
}

pub trait DetectionSink: Send + Sync {
    fn record(&self, event: &DetectionEvent<'_>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DetectionSink for TracingSink {
    fn record(&self, event: &DetectionEvent<'_>) {
        warn!(
            module = event.module,
            path = event.path,
            mode = %event.mode,
            severity = %event.result.severity,
            count = event.result.count,
            vectors = %event.result.vector_list(),
            shallow_scan = event.result.shallow_scan,
            "XSS attack detected"
        );
    }
}

/// Owned copy of a [`DetectionEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDetection {
    pub module: String,
    pub path: String,
    pub mode: Mode,
    pub result: DetectionResult,
}

#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedDetection>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedDetection> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Remove and return all recorded events.
    pub fn drain(&self) -> Vec<RecordedDetection> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl DetectionSink for MemorySink {
    fn record(&self, event: &DetectionEvent<'_>) {
        self.events.lock().push(RecordedDetection {
            module: event.module.to_string(),
            path: event.path.to_string(),
            mode: event.mode,
            result: event.result.clone(),
        });
    }
}
