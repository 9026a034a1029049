//! # rubble-solver
//!
//! Stress relaxation over a support graph of rigid chunks.
//!
//! ## Key Types
//!
//! - [`SequentialImpulseSolver`]: Gauss–Seidel impulse relaxation over an abstract node/bond graph
//! - [`SupportGraphProcessor`]: Physical ↔ solver graph aggregation and bond stress read-back
//! - [`SyncState`]: What has to be rebuilt before the next solve
//! - [`StressSolverSettings`]: Hardness, stress factors, iteration budget, reduction level

pub mod config;
pub mod impulse;
pub mod processor;
pub mod sync;

pub use config::StressSolverSettings;
pub use impulse::SequentialImpulseSolver;
pub use processor::{is_overstressed, ForceMode, SupportGraphProcessor};
pub use sync::{SyncState, SyncStats};
