//! Stress solver settings.
//!
//! Stress on every bond is calculated as
//!
//! ```text
//! stress = (|impulse_linear| * stress_linear_factor
//!         + |impulse_angular| * stress_angular_factor) / (contributors * hardness)
//! ```
//!
//! `graph_reduction_level` is the number of node merge passes. The
//! resulting solver graph is roughly `2^graph_reduction_level` times
//! smaller than the support graph.

use serde::{Deserialize, Serialize};

use rubble_types::constants::{
    DEFAULT_BOND_ITERATIONS_PER_FRAME, DEFAULT_GRAPH_REDUCTION_LEVEL, DEFAULT_HARDNESS,
    DEFAULT_STRESS_ANGULAR_FACTOR, DEFAULT_STRESS_LINEAR_FACTOR,
};
use rubble_types::{RubbleError, RubbleResult};

/// Configuration for the stress solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressSolverSettings {
    /// Hardness of the bond material.
    pub hardness: f32,

    /// Linear stress multiplier.
    pub stress_linear_factor: f32,

    /// Angular stress multiplier.
    pub stress_angular_factor: f32,

    /// Bond iterations to spend per frame, see [`Self::iterations_per_frame`].
    pub bond_iterations_per_frame: u32,

    /// Graph reduction level. Changing it rebuilds the solver graph.
    pub graph_reduction_level: u32,
}

impl Default for StressSolverSettings {
    fn default() -> Self {
        Self {
            hardness: DEFAULT_HARDNESS,
            stress_linear_factor: DEFAULT_STRESS_LINEAR_FACTOR,
            stress_angular_factor: DEFAULT_STRESS_ANGULAR_FACTOR,
            bond_iterations_per_frame: DEFAULT_BOND_ITERATIONS_PER_FRAME,
            graph_reduction_level: DEFAULT_GRAPH_REDUCTION_LEVEL,
        }
    }
}

impl StressSolverSettings {
    /// Creates settings for debugging (no aggregation, small budget).
    pub fn debug() -> Self {
        Self {
            bond_iterations_per_frame: 1_000,
            graph_reduction_level: 0,
            ..Default::default()
        }
    }

    /// Creates high-quality settings (finer graph, larger budget).
    pub fn high_quality() -> Self {
        Self {
            bond_iterations_per_frame: 100_000,
            graph_reduction_level: 1,
            ..Default::default()
        }
    }

    /// Number of solver iterations per frame for a given solver bond count.
    ///
    /// The per-frame budget is spread over all bonds, never below one pass.
    pub fn iterations_per_frame(&self, bond_count: u32) -> u32 {
        let per_frame = self.bond_iterations_per_frame / (bond_count + 1);
        per_frame.max(1)
    }

    /// Checks that the multipliers are usable.
    pub fn validate(&self) -> RubbleResult<()> {
        if self.hardness.is_nan() || self.hardness <= 0.0 {
            return Err(RubbleError::InvalidConfig(format!(
                "hardness must be positive, got {}",
                self.hardness
            )));
        }
        if self.stress_linear_factor < 0.0 || self.stress_angular_factor < 0.0 {
            return Err(RubbleError::InvalidConfig(
                "stress factors must be non-negative".into(),
            ));
        }
        if self.graph_reduction_level > 31 {
            return Err(RubbleError::InvalidConfig(format!(
                "graph reduction level {} exceeds 31",
                self.graph_reduction_level
            )));
        }
        Ok(())
    }
}
