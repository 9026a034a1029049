//! # rubble-telemetry
//!
//! Event bus for stress solver telemetry. Emits structured per-frame
//! events (solve summaries, graph resyncs, fractures, resets) that can be
//! consumed by pluggable sinks.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{StressEvent, StressEventKind};
pub use sinks::{EventSink, TracingSink, VecSink};
