//! # rubble-bench
//!
//! Benchmark suite for the Rubble stress solver.
//!
//! Provides procedural structures under load, a frame loop that applies
//! the generated fracture commands and re-splits actors, and CSV/JSON
//! metric export for regression tracking.

pub mod islands;
pub mod metrics;
pub mod runner;
pub mod scenarios;

pub use metrics::BenchmarkMetrics;
pub use runner::BenchmarkRunner;
pub use scenarios::{Scenario, ScenarioConfig, ScenarioKind};
