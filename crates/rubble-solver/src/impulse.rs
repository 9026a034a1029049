//! Sequential impulse solver: Gauss–Seidel relaxation over an abstract
//! node/bond graph.
//!
//! Each node carries a linear and angular velocity plus inverse mass and
//! inverse inertia. Each bond tries to make both endpoints move as one
//! rigid piece; the impulse it needs to do so is accumulated across
//! iterations and is what the stress read-back measures.
//!
//! The solver knows nothing about aggregation or physical meaning.
//! It is a bounded relaxation, not a direct solve: a fixed iteration count
//! is the only stopping criterion.

use glam::Vec3;

use rubble_types::constants::MIN_OFFSET_SQR_LENGTH;

/// Per-bond solver state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondData {
    /// Accumulated linear impulse.
    pub impulse_linear: Vec3,
    pub node0: u32,
    /// Accumulated angular impulse.
    pub impulse_angular: Vec3,
    pub node1: u32,
    /// Attachment offset from node0 (half the centroid delta).
    pub offset0: Vec3,
    /// `1 / |offset0|²`, clamped.
    pub inv_offset_sqr_length: f32,
}

/// Per-node solver state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeData {
    pub velocity_linear: Vec3,
    pub inv_inertia: f32,
    pub velocity_angular: Vec3,
    pub inv_mass: f32,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            velocity_linear: Vec3::ZERO,
            inv_inertia: 0.0,
            velocity_angular: Vec3::ZERO,
            inv_mass: 0.0,
        }
    }
}

/// Iterative impulse solver.
///
/// ```text
/// solver.set_node_mass_info(..);   // once per node after every graph rebuild
/// solver.add_bond(..);             // once per bond
/// loop {
///     solver.initialize();
///     solver.set_node_velocities(..);
///     solver.solve(iterations, warm_start);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SequentialImpulseSolver {
    bonds: Vec<BondData>,
    nodes: Vec<NodeData>,
}

impl SequentialImpulseSolver {
    /// Creates a solver for `node_count` nodes with room for `max_bond_count` bonds.
    pub fn new(node_count: usize, max_bond_count: usize) -> Self {
        Self {
            bonds: Vec::with_capacity(max_bond_count),
            nodes: vec![NodeData::default(); node_count],
        }
    }

    pub fn node_data(&self, node: u32) -> &NodeData {
        &self.nodes[node as usize]
    }

    pub fn bond_data(&self, bond: u32) -> &BondData {
        &self.bonds[bond as usize]
    }

    pub fn bond_count(&self) -> u32 {
        self.bonds.len() as u32
    }

    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn bonds(&self) -> &[BondData] {
        &self.bonds
    }

    pub fn set_node_mass_info(&mut self, node: u32, inv_mass: f32, inv_inertia: f32) {
        debug_assert!((node as usize) < self.nodes.len());
        let data = &mut self.nodes[node as usize];
        data.inv_mass = inv_mass;
        data.inv_inertia = inv_inertia;
    }

    /// Zeroes every node velocity.
    pub fn initialize(&mut self) {
        for node in &mut self.nodes {
            node.velocity_linear = Vec3::ZERO;
            node.velocity_angular = Vec3::ZERO;
        }
    }

    pub fn set_node_velocities(&mut self, node: u32, linear: Vec3, angular: Vec3) {
        debug_assert!((node as usize) < self.nodes.len());
        let data = &mut self.nodes[node as usize];
        data.velocity_linear = linear;
        data.velocity_angular = angular;
    }

    /// Adds a bond between two distinct nodes and returns its index.
    pub fn add_bond(&mut self, node0: u32, node1: u32, offset: Vec3) -> u32 {
        debug_assert!(node0 != node1, "bond endpoints must differ");
        debug_assert!((node0 as usize) < self.nodes.len());
        debug_assert!((node1 as usize) < self.nodes.len());
        self.bonds.push(BondData {
            impulse_linear: Vec3::ZERO,
            node0,
            impulse_angular: Vec3::ZERO,
            node1,
            offset0: offset,
            inv_offset_sqr_length: 1.0 / offset.length_squared().max(MIN_OFFSET_SQR_LENGTH),
        });
        self.bonds.len() as u32 - 1
    }

    /// Removes a bond in O(1); the last bond takes its index.
    pub fn replace_with_last(&mut self, bond: u32) {
        self.bonds.swap_remove(bond as usize);
    }

    /// Drops all bonds and resizes the node array.
    pub fn reset(&mut self, node_count: usize) {
        self.bonds.clear();
        self.nodes.clear();
        self.nodes.resize(node_count, NodeData::default());
    }

    pub fn clear_bonds(&mut self) {
        self.bonds.clear();
    }

    /// Runs `iteration_count` relaxation passes.
    ///
    /// With `warm_start` the impulses accumulated by the previous solve are
    /// applied to the nodes first; otherwise they restart from zero.
    pub fn solve(&mut self, iteration_count: u32, warm_start: bool) {
        self.solve_init(warm_start);
        for _ in 0..iteration_count {
            self.iterate();
        }
    }

    /// Residual velocity error summed over all bonds, `(linear, angular)`.
    pub fn calc_error(&self) -> (f32, f32) {
        let mut linear = 0.0;
        let mut angular = 0.0;
        for bond in &self.bonds {
            let node0 = &self.nodes[bond.node0 as usize];
            let node1 = &self.nodes[bond.node1 as usize];
            let (error_linear, error_angular) = velocity_error(node0, node1, bond.offset0);
            linear += error_linear.length();
            angular += error_angular.length();
        }
        (linear, angular)
    }

    fn solve_init(&mut self, warm_start: bool) {
        if warm_start {
            for bond in &self.bonds {
                apply_impulse(&mut self.nodes, bond, bond.impulse_linear, bond.impulse_angular);
            }
        } else {
            for bond in &mut self.bonds {
                bond.impulse_linear = Vec3::ZERO;
                bond.impulse_angular = Vec3::ZERO;
            }
        }
    }

    fn iterate(&mut self) {
        for bond in &mut self.bonds {
            let node0 = &self.nodes[bond.node0 as usize];
            let node1 = &self.nodes[bond.node1 as usize];
            let (error_linear, error_angular) = velocity_error(node0, node1, bond.offset0);

            // The lever-arm term doubles the response across the bond axis,
            // so only half of that part of the error is corrected per pass.
            let error_axial =
                bond.offset0 * (error_linear.dot(bond.offset0) * bond.inv_offset_sqr_length);
            let error_linear = error_axial + (error_linear - error_axial) * 0.5;

            let weighted_mass = inverse_or_zero(node0.inv_mass + node1.inv_mass);
            let weighted_inertia = 0.5 * inverse_or_zero(node0.inv_inertia + node1.inv_inertia);
            let out_impulse_linear = -error_linear * weighted_mass;
            let out_impulse_angular = -error_angular * weighted_inertia;

            bond.impulse_linear += out_impulse_linear;
            bond.impulse_angular += out_impulse_angular;

            apply_impulse(&mut self.nodes, bond, out_impulse_linear, out_impulse_angular);
        }
    }
}

/// Relative velocity at the attachment point and relative spin.
#[inline]
fn velocity_error(node0: &NodeData, node1: &NodeData, offset: Vec3) -> (Vec3, Vec3) {
    let v_a = node0.velocity_linear - node0.velocity_angular.cross(offset);
    let v_b = node1.velocity_linear + node1.velocity_angular.cross(offset);
    (v_a - v_b, node0.velocity_angular - node1.velocity_angular)
}

/// Pushes node0 along the impulse and node1 against it.
#[inline]
fn apply_impulse(nodes: &mut [NodeData], bond: &BondData, impulse_linear: Vec3, impulse_angular: Vec3) {
    let (i0, i1) = (bond.node0 as usize, bond.node1 as usize);

    let linear_corr0 = impulse_linear * nodes[i0].inv_mass;
    let linear_corr1 = impulse_linear * nodes[i1].inv_mass;
    let angular_corr0 = impulse_angular * nodes[i0].inv_inertia
        - bond.offset0.cross(linear_corr0) * bond.inv_offset_sqr_length;
    let angular_corr1 = impulse_angular * nodes[i1].inv_inertia
        + bond.offset0.cross(linear_corr1) * bond.inv_offset_sqr_length;

    nodes[i0].velocity_linear += linear_corr0;
    nodes[i1].velocity_linear -= linear_corr1;
    nodes[i0].velocity_angular += angular_corr0;
    nodes[i1].velocity_angular -= angular_corr1;
}

#[inline]
fn inverse_or_zero(sum: f32) -> f32 {
    if sum > 0.0 {
        1.0 / sum
    } else {
        0.0
    }
}
