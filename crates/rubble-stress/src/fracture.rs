//! Fracture commands handed back to the fracture kernel.

use serde::{Deserialize, Serialize};

use rubble_types::ActorId;

/// One bond to damage, in the kernel's apply-fracture layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondFractureData {
    /// Left at 0 by the solver, free for the caller.
    pub user_data: u32,
    /// Asset bond index, also the slot in the health array.
    pub bond_index: u32,
    pub node_index0: u32,
    pub node_index1: u32,
    /// Health to subtract. The full remaining health, so the bond breaks.
    pub health: f32,
}

impl BondFractureData {
    pub fn new(bond_index: u32, node_index0: u32, node_index1: u32, health: f32) -> Self {
        Self {
            user_data: 0,
            bond_index,
            node_index0,
            node_index1,
            health,
        }
    }
}

/// Fracture commands for one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorFractureCommands {
    pub actor: ActorId,
    pub commands: Vec<BondFractureData>,
}
