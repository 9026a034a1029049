//! # rubble-types
//!
//! Shared identifiers, error types, and solver defaults
//! for the Rubble structural stress solver.
//!
//! This crate has zero domain logic. It defines the vocabulary
//! that all other Rubble crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{RubbleError, RubbleResult};
pub use ids::{ActorId, INVALID_INDEX};
