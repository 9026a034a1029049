//! Identifiers shared across crates.
//!
//! Graph nodes and asset bonds stay plain `u32` indices, matching the
//! fracture kernel's arrays; only actor handles get a newtype since they
//! key side tables and never index an array.

use serde::{Deserialize, Serialize};

/// Sentinel for "no index", matching the fracture kernel's convention.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Stable handle of an actor within one family.
///
/// The fracture kernel owns actors; the solver only keys its side
/// tables by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl From<u32> for ActorId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}
