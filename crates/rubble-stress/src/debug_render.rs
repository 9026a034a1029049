//! Debug line output for the solver graph.
//!
//! Colors are packed as `0xAABBGGRR`.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// What to draw on top of the stress-colored solver bonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DebugRenderMode {
    /// Solver bonds only.
    #[default]
    StressGraph,
    /// Plus solver node velocities at both bond ends.
    StressGraphNodesImpulses,
    /// Plus the accumulated bond impulses at the bond center.
    StressGraphBondsImpulses,
}

/// A colored line segment in the family's local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebugLine {
    pub pos0: Vec3,
    pub color0: u32,
    pub pos1: Vec3,
    pub color1: u32,
}

impl DebugLine {
    pub fn new(pos0: Vec3, pos1: Vec3, color: u32) -> Self {
        Self {
            pos0,
            color0: color,
            pos1,
            color1: color,
        }
    }
}

const BOND_HEALTHY_COLOR: Vec4 = Vec4::new(0.0, 1.0, 1.0, 1.0);
const BOND_MID_COLOR: Vec4 = Vec4::new(1.0, 1.0, 0.0, 1.0);
const BOND_BROKEN_COLOR: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

pub const IMPULSE_LINEAR_COLOR: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
pub const IMPULSE_ANGULAR_COLOR: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

/// Packs an RGBA color in `[0, 1]` into `0xAABBGGRR`.
pub fn pack_color(color: Vec4) -> u32 {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u32;
    channel(color.w) << 24 | channel(color.z) << 16 | channel(color.y) << 8 | channel(color.x)
}

/// Red at 0, yellow at 0.5, cyan at 1.
pub fn bond_health_color(health_fraction: f32) -> Vec4 {
    let t = health_fraction.clamp(0.0, 1.0);
    if t < 0.5 {
        BOND_BROKEN_COLOR.lerp(BOND_MID_COLOR, 2.0 * t)
    } else {
        BOND_MID_COLOR.lerp(BOND_HEALTHY_COLOR, 2.0 * t - 1.0)
    }
}

/// Line color for a bond carrying `stress` (1.0 means at its limit).
pub fn stress_color(stress: f32) -> u32 {
    pack_color(bond_health_color(1.0 - stress.min(1.0)))
}
