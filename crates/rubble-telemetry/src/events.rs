//! Stress solver event types.
//!
//! Events are small value types emitted once per notable step of a
//! family's frame. They carry just enough data to chart solver health
//! over time.

use serde::{Deserialize, Serialize};

/// An event emitted by a stress solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressEvent {
    /// Frame number since the last reset.
    pub frame: u32,
    /// Event payload.
    pub kind: StressEventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StressEventKind {
    /// One update finished.
    FrameSolved {
        /// Relaxation passes run this frame.
        iterations: u32,
        /// Solver bonds after aggregation.
        solver_bonds: u32,
        /// Bonds at or past their health.
        overstressed: u32,
        /// Residual linear velocity error.
        error_linear: f32,
        /// Residual angular velocity error.
        error_angular: f32,
    },

    /// The solver graph was rebuilt during the frame.
    GraphResynced {
        /// Solver nodes after reduction.
        solver_nodes: u32,
        /// Total full clustering passes so far.
        node_resyncs: u32,
        /// Total bond re-aggregations so far.
        bond_resyncs: u32,
    },

    /// Fracture commands were generated.
    Fractured {
        /// Actor the commands were generated for, `None` for the whole family.
        actor: Option<u32>,
        /// Number of bond fracture commands.
        bond_count: u32,
    },

    /// A reset was requested; the next frame cold-starts.
    Reset,

    /// Custom event for extensibility.
    Custom {
        /// Arbitrary label.
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl StressEvent {
    /// Creates a new event for the given frame.
    pub fn new(frame: u32, kind: StressEventKind) -> Self {
        Self { frame, kind }
    }
}
