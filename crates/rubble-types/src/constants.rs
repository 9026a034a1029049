//! Solver defaults and numeric guards.

/// Default bond material hardness. Stress is divided by this value.
pub const DEFAULT_HARDNESS: f32 = 1000.0;

/// Default multiplier on the linear impulse magnitude.
pub const DEFAULT_STRESS_LINEAR_FACTOR: f32 = 0.25;

/// Default multiplier on the angular impulse magnitude.
pub const DEFAULT_STRESS_ANGULAR_FACTOR: f32 = 0.75;

/// Default bond-iteration budget per frame. Divided by the solver bond count.
pub const DEFAULT_BOND_ITERATIONS_PER_FRAME: u32 = 18_000;

/// Default number of graph reduction passes.
pub const DEFAULT_GRAPH_REDUCTION_LEVEL: u32 = 3;

/// Aggregate growth penalty for static clusters. Static aggregates lag a
/// few reduction levels behind dynamic ones.
pub const STATIC_NODES_COUNT_PENALTY: u32 = 2 << 2;

/// Smallest squared bond offset length used for the lever-arm term.
pub const MIN_OFFSET_SQR_LENGTH: f32 = 1.0e-12;

