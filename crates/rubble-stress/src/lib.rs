//! # rubble-stress
//!
//! Stress solver for one destructible actor family. Feeds external loads
//! into the support graph processor once per frame and turns overstressed
//! bonds into fracture commands for the fracture kernel.
//!
//! ## Key Types
//!
//! - [`StressSolver`]: per-family facade (actors, forces, update, fracture commands)
//! - [`SupportGraph`]: CSR support graph supplied by the fracture kernel
//! - [`BondFractureData`]: one bond fracture command
//! - [`DebugLine`]: stress-colored debug geometry

pub mod debug_render;
pub mod fracture;
pub mod generators;
pub mod stress_solver;
pub mod support_graph;

pub use debug_render::{DebugLine, DebugRenderMode};
pub use fracture::{ActorFractureCommands, BondFractureData};
pub use rubble_solver::{ForceMode, StressSolverSettings};
pub use stress_solver::StressSolver;
pub use support_graph::{ChunkInfo, SupportGraph};
