//! Synchronization state between the support graph and the solver graph.
//!
//! ```text
//!   Clean ──add_bond──▶ BondsDirty ──sync_bonds──▶ Clean
//!     │                     │
//!     └──── reduction / neighbors / internal bond removal ───▶ NodesDirty
//!                                                               │
//!                                       sync_nodes + sync_bonds ◀┘
//! ```

use serde::{Deserialize, Serialize};

/// How much of the solver graph has to be rebuilt before the next solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum SyncState {
    /// Solver graph matches the support graph.
    Clean,
    /// Node clustering is valid, solver bonds must be re-aggregated.
    BondsDirty,
    /// Clustering must be recomputed (implies bond re-aggregation).
    #[default]
    NodesDirty,
}

impl SyncState {
    /// Raises the state to at least `other`. Never lowers it.
    #[inline]
    pub fn escalate(&mut self, other: SyncState) {
        if other > *self {
            *self = other;
        }
    }

    #[inline]
    pub fn is_clean(self) -> bool {
        self == SyncState::Clean
    }
}

/// Counters for graph maintenance work.
///
/// A rising `node_resyncs` under steady fracture is the signal of a
/// resync storm; nothing fails, frames just get slower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Full clustering passes.
    pub node_resyncs: u32,
    /// Bond re-aggregation passes (including the ones chained by node resyncs).
    pub bond_resyncs: u32,
    /// External bonds removed without any resync.
    pub surgical_removals: u32,
}
