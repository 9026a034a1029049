//! Pluggable event sinks.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::events::{StressEvent, StressEventKind};

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &StressEvent);

    /// Called when the driver shuts down. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Collects events in memory.
///
/// Clones share the same storage, so a test can keep one handle and
/// give the other to the bus.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<StressEvent>>>,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events collected so far.
    pub fn events(&self) -> Vec<StressEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StressEvent>> {
        // A panicking sink user cannot leave the Vec half-written.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &StressEvent) {
        self.lock().push(event.clone());
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Logs events through `tracing`.
///
/// Per-frame summaries go out at the configured level, everything else
/// at `INFO`.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: tracing::Level,
}

impl TracingSink {
    /// Creates a new tracing sink at the given log level.
    pub fn new(level: tracing::Level) -> Self {
        Self { level }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(tracing::Level::DEBUG)
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &StressEvent) {
        match &event.kind {
            StressEventKind::FrameSolved {
                iterations,
                solver_bonds,
                overstressed,
                error_linear,
                error_angular,
            } => {
                if self.level == tracing::Level::TRACE {
                    tracing::trace!(frame = event.frame, iterations, solver_bonds, overstressed, error_linear, error_angular, "frame_solved");
                } else if self.level == tracing::Level::DEBUG {
                    tracing::debug!(frame = event.frame, iterations, solver_bonds, overstressed, error_linear, error_angular, "frame_solved");
                } else {
                    tracing::info!(frame = event.frame, iterations, solver_bonds, overstressed, error_linear, error_angular, "frame_solved");
                }
            }
            other => {
                tracing::info!(frame = event.frame, event = ?other, "stress_event");
            }
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
