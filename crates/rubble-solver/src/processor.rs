//! Support graph processor. Keeps the coarse solver graph in step with
//! the physical support graph and turns solver impulses into bond stress.
//!
//! Physical nodes are clustered into solver nodes according to the graph
//! reduction level. Parallel physical bonds between two clusters collapse
//! into one solver bond. Bonds disappearing between clusters are handled
//! in place; anything that could change the clustering marks the nodes
//! dirty and the next [`SupportGraphProcessor::ensure_synced`] rebuilds.

use std::collections::HashMap;
use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use rubble_types::constants::STATIC_NODES_COUNT_PENALTY;
use rubble_types::{RubbleError, RubbleResult, INVALID_INDEX};

use crate::config::StressSolverSettings;
use crate::impulse::{self, SequentialImpulseSolver};
use crate::sync::{SyncState, SyncStats};

/// How an external force is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForceMode {
    /// Mass × distance / time. Applied as is.
    #[default]
    Impulse,
    /// Distance / time. Scaled by the node mass, so the effect is mass independent.
    Velocity,
}

/// Physical (support graph) node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeData {
    pub mass: f32,
    pub volume: f32,
    pub local_pos: Vec3,
    pub is_static: bool,
    /// Index of the solver node this node is aggregated into.
    pub solver_node: u32,
    /// Size of the island this node belongs to.
    pub neighbors_count: u32,
    /// External impulse accumulated since the last solve.
    pub impulse: Vec3,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            mass: 0.0,
            volume: 0.0,
            local_pos: Vec3::ZERO,
            is_static: false,
            solver_node: 0,
            neighbors_count: 0,
            impulse: Vec3::ZERO,
        }
    }
}

/// Physical (support graph) bond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondData {
    pub node0: u32,
    pub node1: u32,
    /// Index into the asset bond array (and the health array).
    pub bond_index: u32,
    /// Stress from the last solve. Zero for internal bonds.
    pub stress: f32,
}

/// Aggregate of one or more physical nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverNodeData {
    pub support_nodes_count: u32,
    pub local_pos: Vec3,
    pub mass: f32,
    pub volume: f32,
    pub is_static: bool,
}

/// Aggregate of the physical bonds between two solver nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverBondData {
    /// Asset bond indices summarized by this solver bond.
    pub bond_indices: Vec<u32>,
}

/// Unordered solver node pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BondKey {
    node0: u32,
    node1: u32,
}

impl BondKey {
    fn new(n0: u32, n1: u32) -> Self {
        Self {
            node0: n0.min(n1),
            node1: n0.max(n1),
        }
    }
}

/// Maintains the physical ↔ solver graph mapping and runs the solve.
#[derive(Debug, Clone)]
pub struct SupportGraphProcessor {
    solver: SequentialImpulseSolver,
    nodes: Vec<NodeData>,
    bonds: Vec<BondData>,
    solver_nodes: Vec<SolverNodeData>,
    solver_bonds: Vec<SolverBondData>,
    solver_bonds_map: HashMap<BondKey, u32>,
    /// Asset bond index → slot in `bonds`, or `INVALID_INDEX`.
    bond_index_map: Vec<u32>,
    /// Reusable per-cluster member lists for `sync_nodes`.
    cluster_members: Vec<Vec<u32>>,
    graph_reduction_level: u32,
    state: SyncState,
    overstressed_bond_count: u32,
    stats: SyncStats,
}

impl SupportGraphProcessor {
    /// Creates a processor for `node_count` support nodes and up to
    /// `max_bond_count` asset bonds.
    pub fn new(node_count: usize, max_bond_count: usize) -> Self {
        Self {
            solver: SequentialImpulseSolver::new(node_count, max_bond_count),
            nodes: vec![NodeData::default(); node_count],
            bonds: Vec::with_capacity(max_bond_count),
            solver_nodes: vec![SolverNodeData::default(); node_count],
            solver_bonds: Vec::with_capacity(max_bond_count),
            solver_bonds_map: HashMap::with_capacity(max_bond_count),
            bond_index_map: vec![INVALID_INDEX; max_bond_count],
            cluster_members: Vec::new(),
            graph_reduction_level: 0,
            state: SyncState::NodesDirty,
            overstressed_bond_count: 0,
            stats: SyncStats::default(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────

    pub fn node_data(&self, node: u32) -> &NodeData {
        &self.nodes[node as usize]
    }

    pub fn bond_data(&self, bond: u32) -> &BondData {
        &self.bonds[bond as usize]
    }

    pub fn solver_node_data(&self, node: u32) -> &SolverNodeData {
        &self.solver_nodes[node as usize]
    }

    pub fn solver_bond_data(&self, bond: u32) -> &SolverBondData {
        &self.solver_bonds[bond as usize]
    }

    pub fn solver_internal_bond_data(&self, bond: u32) -> &impulse::BondData {
        self.solver.bond_data(bond)
    }

    pub fn solver_internal_node_data(&self, node: u32) -> &impulse::NodeData {
        self.solver.node_data(node)
    }

    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    pub fn bonds(&self) -> &[BondData] {
        &self.bonds
    }

    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn bond_count(&self) -> u32 {
        self.bonds.len() as u32
    }

    pub fn solver_node_count(&self) -> u32 {
        self.solver_nodes.len() as u32
    }

    pub fn solver_bond_count(&self) -> u32 {
        self.solver_bonds.len() as u32
    }

    pub fn overstressed_bond_count(&self) -> u32 {
        self.overstressed_bond_count
    }

    pub fn sync_state(&self) -> SyncState {
        self.state
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn graph_reduction_level(&self) -> u32 {
        self.graph_reduction_level
    }

    /// Returns true if `bond_index` is tracked as a live physical bond.
    pub fn contains_bond(&self, bond_index: u32) -> bool {
        self.bond_slot(bond_index).is_some()
    }

    /// Stress of a solver bond, shared by every physical bond it summarizes.
    ///
    /// The impulse is divided uniformly across the contributing bonds.
    pub fn solver_bond_stress(&self, bond: u32, settings: &StressSolverSettings) -> f32 {
        let solver_bond = self.solver.bond_data(bond);
        let impulse = solver_bond.impulse_linear.length() * settings.stress_linear_factor
            + solver_bond.impulse_angular.length() * settings.stress_angular_factor;
        let contributors = self.solver_bonds[bond as usize].bond_indices.len();
        if contributors == 0 {
            0.0
        } else {
            impulse / (contributors as f32 * settings.hardness)
        }
    }

    /// Stress of an asset bond from the last solve, zero if not tracked.
    pub fn bond_stress(&self, bond_index: u32) -> f32 {
        self.bond_slot(bond_index)
            .map_or(0.0, |slot| self.bonds[slot].stress)
    }

    // ─── Node input ──────────────────────────────────────────

    pub fn set_node_info(&mut self, node: u32, mass: f32, volume: f32, local_pos: Vec3, is_static: bool) {
        debug_assert!((node as usize) < self.nodes.len());
        let data = &mut self.nodes[node as usize];
        data.mass = mass;
        data.volume = volume;
        data.local_pos = local_pos;
        data.is_static = is_static;
        self.state.escalate(SyncState::NodesDirty);
    }

    /// Sets the island size hint of a node.
    ///
    /// Expected to be the number of nodes on the node's actor. An aggregate
    /// larger than half the island (typical right after a split) forces
    /// a full resync.
    pub fn set_node_neighbors_count(&mut self, node: u32, neighbors_count: u32) {
        debug_assert!((node as usize) < self.nodes.len());
        let data = &mut self.nodes[node as usize];
        data.neighbors_count = neighbors_count;
        if self.state != SyncState::NodesDirty {
            let aggregate = self.solver_nodes[data.solver_node as usize].support_nodes_count;
            if aggregate > neighbors_count / 2 {
                self.state = SyncState::NodesDirty;
            }
        }
    }

    pub fn add_node_force(&mut self, node: u32, force: Vec3, mode: ForceMode) {
        debug_assert!((node as usize) < self.nodes.len());
        let data = &mut self.nodes[node as usize];
        let impulse = match mode {
            ForceMode::Impulse => force,
            ForceMode::Velocity => force * data.mass,
        };
        data.impulse += impulse;
    }

    pub fn add_node_velocity(&mut self, node: u32, velocity: Vec3) {
        self.add_node_force(node, velocity, ForceMode::Velocity);
    }

    pub fn add_node_impulse(&mut self, node: u32, impulse: Vec3) {
        self.add_node_force(node, impulse, ForceMode::Impulse);
    }

    // ─── Bond input ──────────────────────────────────────────

    /// Registers a physical bond. Repeating a known `bond_index` is a no-op.
    pub fn add_bond(&mut self, node0: u32, node1: u32, bond_index: u32) {
        debug_assert!((node0 as usize) < self.nodes.len());
        debug_assert!((node1 as usize) < self.nodes.len());
        if self.bond_slot(bond_index).is_some() {
            return;
        }
        if bond_index as usize >= self.bond_index_map.len() {
            self.bond_index_map.resize(bond_index as usize + 1, INVALID_INDEX);
        }
        self.bonds.push(BondData {
            node0,
            node1,
            bond_index,
            stress: 0.0,
        });
        self.bond_index_map[bond_index as usize] = self.bonds.len() as u32 - 1;
        self.state.escalate(SyncState::BondsDirty);
    }

    /// Removes a physical bond if it is tracked.
    ///
    /// A bond inside one solver node dirties the clustering. A bond between
    /// two solver nodes is removed from its solver bond in place; the
    /// solver bond itself goes away only once its last contributor does.
    pub fn remove_bond_if_exists(&mut self, bond_index: u32) {
        let Some(slot) = self.bond_slot(bond_index) else {
            return;
        };
        let bond = self.bonds[slot];
        let solver_node0 = self.nodes[bond.node0 as usize].solver_node;
        let solver_node1 = self.nodes[bond.node1 as usize].solver_node;

        match self.state {
            // Rebuilt wholesale on the next sync anyway.
            SyncState::NodesDirty => {}
            // Never happens at reduction level 0.
            _ if solver_node0 == solver_node1 => {
                tracing::trace!(bond_index, solver_node = solver_node0, "internal bond removed, resync required");
                self.state = SyncState::NodesDirty;
            }
            SyncState::Clean => {
                self.remove_from_solver_bond(bond_index, BondKey::new(solver_node0, solver_node1));
                self.stats.surgical_removals += 1;
            }
            SyncState::BondsDirty => {}
        }

        self.bond_index_map[bond_index as usize] = INVALID_INDEX;
        self.bonds.swap_remove(slot);
        if let Some(moved) = self.bonds.get(slot) {
            self.bond_index_map[moved.bond_index as usize] = slot as u32;
        }
    }

    fn remove_from_solver_bond(&mut self, bond_index: u32, key: BondKey) {
        let Some(&solver_bond) = self.solver_bonds_map.get(&key) else {
            return;
        };
        let indices = &mut self.solver_bonds[solver_bond as usize].bond_indices;
        if let Some(pos) = indices.iter().position(|&b| b == bond_index) {
            indices.swap_remove(pos);
        }
        if !indices.is_empty() {
            return;
        }

        tracing::trace!(solver_bond, "last contributor gone, dropping solver bond");
        self.solver_bonds.swap_remove(solver_bond as usize);
        self.solver.replace_with_last(solver_bond);
        self.solver_bonds_map.remove(&key);
        if solver_bond < self.solver.bond_count() {
            let moved = self.solver.bond_data(solver_bond);
            self.solver_bonds_map
                .insert(BondKey::new(moved.node0, moved.node1), solver_bond);
        }
    }

    pub fn set_graph_reduction_level(&mut self, level: u32) {
        self.graph_reduction_level = level;
        self.state = SyncState::NodesDirty;
    }

    // ─── Solve ───────────────────────────────────────────────

    /// Runs one stress solve.
    ///
    /// `bond_healths` is indexed by asset bond index and only read.
    pub fn solve(&mut self, settings: &StressSolverSettings, bond_healths: &[f32], warm_start: bool) {
        self.ensure_synced();

        self.solver.initialize();
        for node in &self.nodes {
            let solver_node = self.solver.node_data(node.solver_node);
            let velocity = solver_node.velocity_linear + node.impulse * solver_node.inv_mass;
            self.solver.set_node_velocities(node.solver_node, velocity, Vec3::ZERO);
        }

        let iteration_count = settings.iterations_per_frame(self.solver_bond_count());
        self.solver.solve(iteration_count, warm_start);

        self.reset_impulses();
        self.update_bond_stress(settings, bond_healths);
    }

    /// Residual error of the last solve, `(linear, angular)`.
    pub fn calc_error(&self) -> (f32, f32) {
        self.solver.calc_error()
    }

    fn reset_impulses(&mut self) {
        for node in &mut self.nodes {
            node.impulse = Vec3::ZERO;
        }
    }

    fn update_bond_stress(&mut self, settings: &StressSolverSettings, bond_healths: &[f32]) {
        self.overstressed_bond_count = 0;
        for solver_bond in 0..self.solver_bonds.len() {
            let stress = self.solver_bond_stress(solver_bond as u32, settings);
            for &bond_index in &self.solver_bonds[solver_bond].bond_indices {
                let slot = self.bond_index_map[bond_index as usize];
                if slot == INVALID_INDEX {
                    continue;
                }
                let bond = &mut self.bonds[slot as usize];
                debug_assert_eq!(bond.bond_index, bond_index);
                bond.stress = stress;

                let health = bond_healths.get(bond_index as usize).copied().unwrap_or(0.0);
                if is_overstressed(stress, health) {
                    self.overstressed_bond_count += 1;
                }
            }
        }
    }

    // ─── Sync ────────────────────────────────────────────────

    /// Rebuilds whatever part of the solver graph is stale.
    pub fn ensure_synced(&mut self) {
        match self.state {
            SyncState::NodesDirty => self.sync_nodes(),
            SyncState::BondsDirty => self.sync_bonds(),
            SyncState::Clean => {}
        }
    }

    fn sync_nodes(&mut self) {
        let node_count = self.nodes.len();

        // Identity: one cluster per physical node.
        self.cluster_members.resize_with(node_count, Vec::new);
        for (i, members) in self.cluster_members.iter_mut().enumerate() {
            members.clear();
            members.push(i as u32);
        }
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.solver_node = i as u32;
        }

        for level in 0..self.graph_reduction_level {
            self.reduce(1u32 << (level + 1).min(31));
        }

        let permutation = self.compact_solver_nodes();
        for node in &mut self.nodes {
            node.solver_node = permutation[node.solver_node as usize];
            debug_assert!(node.solver_node != INVALID_INDEX);
        }

        self.aggregate_solver_nodes();

        self.solver.reset(self.solver_nodes.len());
        for (i, solver_node) in self.solver_nodes.iter().enumerate() {
            let (inv_mass, inv_inertia) = sphere_mass_info(solver_node);
            self.solver.set_node_mass_info(i as u32, inv_mass, inv_inertia);
        }

        self.stats.node_resyncs += 1;
        tracing::debug!(
            level = self.graph_reduction_level,
            nodes = node_count,
            solver_nodes = self.solver_nodes.len(),
            "solver nodes resynced"
        );

        self.sync_bonds();
    }

    /// One reduction pass: greedily merges the smaller endpoint cluster of
    /// each bond into the larger one while the result stays within
    /// `min(max_aggregate_size, island / 2)`.
    fn reduce(&mut self, max_aggregate_size: u32) {
        for bond in &self.bonds {
            let node0 = &self.nodes[bond.node0 as usize];
            let node1 = &self.nodes[bond.node1 as usize];
            if node0.is_static != node1.is_static {
                continue;
            }
            let (cluster0, cluster1) = (node0.solver_node, node1.solver_node);
            if cluster0 == cluster1 {
                continue;
            }

            let penalty = if node0.is_static { STATIC_NODES_COUNT_PENALTY } else { 1 };
            let limit = max_aggregate_size.min(node0.neighbors_count / 2);
            let size0 = self.cluster_members[cluster0 as usize].len() as u32;
            let size1 = self.cluster_members[cluster1 as usize].len() as u32;
            if (size0 + size1) * penalty > limit {
                continue;
            }

            let (into, from) = if size0 >= size1 {
                (cluster0, cluster1)
            } else {
                (cluster1, cluster0)
            };
            let moved = std::mem::take(&mut self.cluster_members[from as usize]);
            for &member in &moved {
                self.nodes[member as usize].solver_node = into;
            }
            self.cluster_members[into as usize].extend_from_slice(&moved);
        }
    }

    /// Drops empty clusters while keeping the order of the rest.
    ///
    /// Returns the old → new index permutation (`INVALID_INDEX` for dropped
    /// slots); the caller applies it to every back-reference.
    fn compact_solver_nodes(&mut self) -> Vec<u32> {
        let mut permutation = vec![INVALID_INDEX; self.cluster_members.len()];
        let mut next = 0u32;
        for (old, members) in self.cluster_members.iter().enumerate() {
            if !members.is_empty() {
                permutation[old] = next;
                next += 1;
            }
        }
        self.solver_nodes.clear();
        self.solver_nodes.resize(next as usize, SolverNodeData::default());
        permutation
    }

    fn aggregate_solver_nodes(&mut self) {
        for node in &self.nodes {
            let solver_node = &mut self.solver_nodes[node.solver_node as usize];
            solver_node.support_nodes_count += 1;
            solver_node.local_pos += node.local_pos;
            solver_node.mass += node.mass;
            solver_node.volume += node.volume;
            solver_node.is_static |= node.is_static;
        }
        for solver_node in &mut self.solver_nodes {
            debug_assert!(solver_node.support_nodes_count > 0);
            solver_node.local_pos /= solver_node.support_nodes_count as f32;
        }
    }

    fn sync_bonds(&mut self) {
        self.solver.clear_bonds();
        self.solver_bonds_map.clear();
        self.solver_bonds.clear();

        for bond in &mut self.bonds {
            // Internal bonds are skipped below and would keep a stale value.
            bond.stress = 0.0;

            let node0 = &self.nodes[bond.node0 as usize];
            let node1 = &self.nodes[bond.node1 as usize];
            if node0.solver_node == node1.solver_node {
                continue;
            }
            if node0.is_static && node1.is_static {
                continue;
            }

            let key = BondKey::new(node0.solver_node, node1.solver_node);
            let solver_bond = match self.solver_bonds_map.get(&key) {
                Some(&index) => index,
                None => {
                    let pos0 = self.solver_nodes[node0.solver_node as usize].local_pos;
                    let pos1 = self.solver_nodes[node1.solver_node as usize].local_pos;
                    let index = self
                        .solver
                        .add_bond(node0.solver_node, node1.solver_node, (pos1 - pos0) * 0.5);
                    self.solver_bonds.push(SolverBondData::default());
                    self.solver_bonds_map.insert(key, index);
                    index
                }
            };
            self.solver_bonds[solver_bond as usize]
                .bond_indices
                .push(bond.bond_index);
        }

        self.stats.bond_resyncs += 1;
        self.state = SyncState::Clean;
        tracing::trace!(solver_bonds = self.solver_bonds.len(), "solver bonds resynced");
    }

    fn bond_slot(&self, bond_index: u32) -> Option<usize> {
        match self.bond_index_map.get(bond_index as usize) {
            Some(&slot) if slot != INVALID_INDEX => Some(slot as usize),
            _ => None,
        }
    }

    // ─── Integrity ───────────────────────────────────────────

    /// Checks the physical ↔ solver mapping invariants of a synced graph.
    pub fn validate_integrity(&self) -> RubbleResult<()> {
        let fail = |msg: String| Err(RubbleError::InvalidGraph(msg));

        if self.solver.node_count() as usize != self.solver_nodes.len() {
            return fail("solver node count mismatch".into());
        }
        if self.solver.bond_count() as usize != self.solver_bonds.len() {
            return fail("solver bond count mismatch".into());
        }

        let mut members = vec![0u32; self.solver_nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            match members.get_mut(node.solver_node as usize) {
                Some(count) => *count += 1,
                None => return fail(format!("node {i} maps to dead solver node {}", node.solver_node)),
            }
        }
        for (i, (&count, solver_node)) in members.iter().zip(&self.solver_nodes).enumerate() {
            if count == 0 || count != solver_node.support_nodes_count {
                return fail(format!("solver node {i} has {count} members"));
            }
        }

        let mut expected: HashMap<BondKey, usize> = HashMap::new();
        for bond in &self.bonds {
            let node0 = &self.nodes[bond.node0 as usize];
            let node1 = &self.nodes[bond.node1 as usize];
            if node0.solver_node != node1.solver_node && !(node0.is_static && node1.is_static) {
                *expected
                    .entry(BondKey::new(node0.solver_node, node1.solver_node))
                    .or_default() += 1;
            }
        }
        if expected.len() != self.solver_bonds.len() {
            return fail(format!(
                "{} solver bonds for {} connected pairs",
                self.solver_bonds.len(),
                expected.len()
            ));
        }
        for (i, internal) in self.solver.bonds().iter().enumerate() {
            let key = BondKey::new(internal.node0, internal.node1);
            if self.solver_bonds_map.get(&key) != Some(&(i as u32)) {
                return fail(format!("solver bond {i} not mapped"));
            }
            let contributors = self.solver_bonds[i].bond_indices.len();
            if expected.get(&key) != Some(&contributors) {
                return fail(format!("solver bond {i} has {contributors} contributors"));
            }
        }

        for (slot, bond) in self.bonds.iter().enumerate() {
            if self.bond_index_map[bond.bond_index as usize] as usize != slot {
                return fail(format!("bond {} not mapped to slot {slot}", bond.bond_index));
            }
        }
        Ok(())
    }
}

/// A live bond breaks once its stress reaches its health.
#[inline]
pub fn is_overstressed(stress: f32, health: f32) -> bool {
    health > 0.0 && stress >= health
}

/// Inverse mass and inertia of an aggregate using a sphere of equal volume.
fn sphere_mass_info(solver_node: &SolverNodeData) -> (f32, f32) {
    let inv_mass = if solver_node.is_static || solver_node.mass <= 0.0 {
        0.0
    } else {
        1.0 / solver_node.mass
    };
    let radius = (solver_node.volume * 3.0 / (4.0 * PI)).cbrt();
    // I = 2/5 * M * R²
    let radius_sqr = radius * radius;
    let inv_inertia = if radius_sqr > 0.0 {
        inv_mass / (0.4 * radius_sqr)
    } else {
        0.0
    };
    (inv_mass, inv_inertia)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_volume_aggregate_has_finite_inertia() {
        let (inv_mass, inv_inertia) = sphere_mass_info(&SolverNodeData {
            support_nodes_count: 1,
            mass: 2.0,
            volume: 0.0,
            ..Default::default()
        });
        assert_eq!(inv_mass, 0.5);
        assert_eq!(inv_inertia, 0.0);
    }

    #[test]
    fn unit_sphere_inertia() {
        let volume = 4.0 / 3.0 * PI;
        let (inv_mass, inv_inertia) = sphere_mass_info(&SolverNodeData {
            support_nodes_count: 1,
            mass: 1.0,
            volume,
            ..Default::default()
        });
        assert_eq!(inv_mass, 1.0);
        assert!((inv_inertia - 2.5).abs() < 1e-4);
    }
}
