//! Stress solver bound to one actor family.
//!
//! The facade owns a [`SupportGraphProcessor`] built from the family's
//! support graph and keeps a side table of the actors that take part in
//! the solve. Per frame the caller:
//!
//! ```text
//! notify_actor_created / notify_actor_destroyed   (after splits)
//! add_force / add_gravity_force / ...             (any number)
//! update(bond_healths)
//! generate_fracture_commands*(bond_healths)       (apply to the kernel)
//! ```
//!
//! Bond healths are owned by the fracture kernel and passed in on every
//! call that needs them; the solver never writes them.

use std::collections::HashMap;

use glam::Vec3;

use rubble_solver::processor::is_overstressed;
use rubble_solver::{ForceMode, StressSolverSettings, SupportGraphProcessor, SyncStats};
use rubble_telemetry::{EventBus, StressEvent, StressEventKind};
use rubble_types::{ActorId, RubbleError, RubbleResult};

use crate::debug_render::{
    pack_color, stress_color, DebugLine, DebugRenderMode, IMPULSE_ANGULAR_COLOR,
    IMPULSE_LINEAR_COLOR,
};
use crate::fracture::{ActorFractureCommands, BondFractureData};
use crate::support_graph::{ChunkInfo, SupportGraph};

/// Per-family stress solver.
#[derive(Debug)]
pub struct StressSolver {
    graph: SupportGraph,
    processor: SupportGraphProcessor,
    settings: StressSolverSettings,
    /// Participating actors and their graph nodes.
    actors: HashMap<ActorId, Vec<u32>>,
    /// Actors changed since the last update.
    is_dirty: bool,
    /// Next update cold-starts.
    reset: bool,
    error_linear: f32,
    error_angular: f32,
    frame_count: u32,
    fracture_buffer: Vec<BondFractureData>,
    dead_bonds: Vec<u32>,
    debug_lines: Vec<DebugLine>,
    solver_node_mask: Vec<bool>,
    events: Option<EventBus>,
}

impl StressSolver {
    /// Creates a solver for a family.
    ///
    /// Every bond with positive health becomes a physical bond. Node
    /// information still has to be provided before the first update.
    pub fn new(
        graph: SupportGraph,
        bond_healths: &[f32],
        settings: StressSolverSettings,
    ) -> RubbleResult<Self> {
        graph.validate()?;
        settings.validate()?;

        let bond_count = graph.bond_count();
        if (bond_healths.len() as u32) < bond_count {
            return Err(RubbleError::InvalidGraph(format!(
                "{} bond healths for {bond_count} bonds",
                bond_healths.len()
            )));
        }

        let mut processor = SupportGraphProcessor::new(graph.node_count() as usize, bond_count as usize);
        for (node0, node1, bond_index) in graph.bonds() {
            if bond_healths[bond_index as usize] > 0.0 {
                processor.add_bond(node0, node1, bond_index);
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            bonds = processor.bond_count(),
            level = settings.graph_reduction_level,
            "stress solver created"
        );

        Ok(Self {
            graph,
            processor,
            settings,
            actors: HashMap::new(),
            is_dirty: false,
            reset: false,
            error_linear: f32::MAX,
            error_angular: f32::MAX,
            frame_count: 0,
            fracture_buffer: Vec::with_capacity(bond_count as usize),
            dead_bonds: Vec::new(),
            debug_lines: Vec::new(),
            solver_node_mask: Vec::new(),
            events: None,
        })
    }

    /// Attaches a telemetry bus. Events are flushed at the end of every
    /// call that emits them.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn event_bus_mut(&mut self) -> Option<&mut EventBus> {
        self.events.as_mut()
    }

    // ─── Configuration ───────────────────────────────────────

    pub fn settings(&self) -> &StressSolverSettings {
        &self.settings
    }

    /// Replaces the settings. A new reduction level takes effect on the
    /// next update.
    pub fn set_settings(&mut self, settings: StressSolverSettings) -> RubbleResult<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    // ─── Nodes & actors ──────────────────────────────────────

    pub fn set_node_info(&mut self, node: u32, mass: f32, volume: f32, local_pos: Vec3, is_static: bool) {
        self.processor.set_node_info(node, mass, volume, local_pos, is_static);
    }

    /// Derives every node's info from chunk geometry.
    ///
    /// The world node is static and massless. Nodes bonded to the world
    /// by a live bond are static as well, which gives the solver more
    /// than one anchor.
    pub fn set_all_nodes_info_from_chunks(&mut self, chunks: &[ChunkInfo], bond_healths: &[f32], density: f32) {
        for node0 in 0..self.graph.node_count() {
            if self.graph.is_world_node(node0, chunks.len()) {
                self.processor.set_node_info(node0, 0.0, 0.0, Vec3::ZERO, true);
                continue;
            }

            let connected_to_world = self.graph.neighbors(node0).any(|(node1, bond_index)| {
                bond_healths.get(bond_index as usize).copied().unwrap_or(0.0) > 0.0
                    && self.graph.is_world_node(node1, chunks.len())
            });

            let chunk = &chunks[self.graph.chunk_indices[node0 as usize] as usize];
            self.processor.set_node_info(
                node0,
                chunk.volume * density,
                chunk.volume,
                chunk.centroid,
                connected_to_world,
            );
        }
    }

    /// Registers an actor after a split or at spawn.
    ///
    /// Single-node actors carry no bonds and are ignored; returns whether
    /// the actor takes part in the solve.
    pub fn notify_actor_created(&mut self, actor: ActorId, graph_nodes: &[u32]) -> bool {
        if graph_nodes.len() <= 1 {
            return false;
        }
        let island = graph_nodes.len() as u32;
        for &node in graph_nodes {
            self.processor.set_node_neighbors_count(node, island);
        }
        self.actors.insert(actor, graph_nodes.to_vec());
        self.is_dirty = true;
        tracing::trace!(actor = actor.0, nodes = island, "actor registered");
        true
    }

    pub fn notify_actor_destroyed(&mut self, actor: ActorId) {
        if self.actors.remove(&actor).is_some() {
            self.is_dirty = true;
            tracing::trace!(actor = actor.0, "actor unregistered");
        }
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn actor_nodes(&self, actor: ActorId) -> Option<&[u32]> {
        self.actors.get(&actor).map(Vec::as_slice)
    }

    // ─── Forces ──────────────────────────────────────────────

    /// Applies a force at the actor node closest to `local_position`.
    pub fn add_force(&mut self, actor: ActorId, local_position: Vec3, local_force: Vec3, mode: ForceMode) -> bool {
        let Some(nodes) = self.actors.get(&actor) else {
            return false;
        };
        let nearest = nodes.iter().copied().min_by(|&a, &b| {
            let da = (local_position - self.processor.node_data(a).local_pos).length_squared();
            let db = (local_position - self.processor.node_data(b).local_pos).length_squared();
            da.total_cmp(&db)
        });
        match nearest {
            Some(node) => {
                self.processor.add_node_force(node, local_force, mode);
                true
            }
            None => false,
        }
    }

    pub fn add_node_force(&mut self, node: u32, local_force: Vec3, mode: ForceMode) {
        self.processor.add_node_force(node, local_force, mode);
    }

    /// Applies gravity to every node of the actor.
    pub fn add_gravity_force(&mut self, actor: ActorId, local_gravity: Vec3) -> bool {
        let Some(nodes) = self.actors.get(&actor) else {
            return false;
        };
        for &node in nodes {
            self.processor.add_node_velocity(node, local_gravity);
        }
        true
    }

    /// Applies the centrifugal load of an actor spinning about its center
    /// of mass: `a = ω × (ω × (r - c))` on every node.
    pub fn add_angular_velocity(
        &mut self,
        actor: ActorId,
        local_center_mass: Vec3,
        local_angular_velocity: Vec3,
    ) -> bool {
        let Some(nodes) = self.actors.get(&actor) else {
            return false;
        };
        let omega = local_angular_velocity;
        for &node in nodes {
            let r = self.processor.node_data(node).local_pos - local_center_mass;
            let centrifugal = omega.cross(omega.cross(r));
            self.processor.add_node_velocity(node, centrifugal);
        }
        true
    }

    // ─── Update ──────────────────────────────────────────────

    /// Runs one frame of stress solving.
    pub fn update(&mut self, bond_healths: &[f32]) {
        if self.reset {
            self.frame_count = 0;
        }
        self.remove_dead_bonds(bond_healths);
        if self.settings.graph_reduction_level != self.processor.graph_reduction_level() {
            self.processor.set_graph_reduction_level(self.settings.graph_reduction_level);
        }

        let stats_before = self.processor.stats();
        let warm_start = !self.reset;
        self.processor.solve(&self.settings, bond_healths, warm_start);
        self.reset = false;

        (self.error_linear, self.error_angular) = self.processor.calc_error();
        let frame = self.frame_count;
        self.frame_count += 1;

        let stats = self.processor.stats();
        if stats.node_resyncs != stats_before.node_resyncs {
            self.publish(
                frame,
                StressEventKind::GraphResynced {
                    solver_nodes: self.processor.solver_node_count(),
                    node_resyncs: stats.node_resyncs,
                    bond_resyncs: stats.bond_resyncs,
                },
            );
        }
        tracing::trace!(
            frame,
            warm_start,
            overstressed = self.processor.overstressed_bond_count(),
            error_linear = self.error_linear,
            "stress frame solved"
        );
        self.publish(
            frame,
            StressEventKind::FrameSolved {
                iterations: self.iterations_per_frame(),
                solver_bonds: self.processor.solver_bond_count(),
                overstressed: self.processor.overstressed_bond_count(),
                error_linear: self.error_linear,
                error_angular: self.error_angular,
            },
        );
    }

    /// Makes the next update cold-start and restart the frame count.
    pub fn reset(&mut self) {
        self.reset = true;
        self.publish(self.frame_count, StressEventKind::Reset);
    }

    /// Drops every tracked bond whose health reached zero, whether or not
    /// the family split.
    fn remove_dead_bonds(&mut self, bond_healths: &[f32]) {
        let before = self.processor.bond_count();
        self.dead_bonds.clear();
        self.dead_bonds.extend(
            self.processor
                .bonds()
                .iter()
                .map(|bond| bond.bond_index)
                .filter(|&bond_index| bond_healths.get(bond_index as usize).copied().unwrap_or(0.0) <= 0.0),
        );
        for &bond_index in &self.dead_bonds {
            self.processor.remove_bond_if_exists(bond_index);
        }
        let removed = before - self.processor.bond_count();
        if removed > 0 {
            tracing::debug!(removed, state = ?self.processor.sync_state(), "dead bonds removed");
        }
        self.is_dirty = false;
    }

    // ─── Fracture ────────────────────────────────────────────

    /// Fracture commands for the overstressed bonds of one actor.
    pub fn generate_fracture_commands_for_actor(&mut self, actor: ActorId, bond_healths: &[f32]) -> &[BondFractureData] {
        self.fracture_buffer.clear();
        if let Some(nodes) = self.actors.get(&actor) {
            fill_fracture_commands(
                &self.graph,
                &self.processor,
                nodes,
                bond_healths,
                &mut self.fracture_buffer,
            );
        }
        if !self.fracture_buffer.is_empty() {
            let bond_count = self.fracture_buffer.len() as u32;
            self.publish(
                self.frame_count,
                StressEventKind::Fractured {
                    actor: Some(actor.0),
                    bond_count,
                },
            );
        }
        &self.fracture_buffer
    }

    /// Fracture commands for every overstressed bond of the family.
    pub fn generate_fracture_commands(&mut self, bond_healths: &[f32]) -> &[BondFractureData] {
        self.fracture_buffer.clear();
        let overstressed = self.processor.overstressed_bond_count() as usize;
        for bond in self.processor.bonds() {
            if self.fracture_buffer.len() >= overstressed {
                break;
            }
            let health = bond_healths.get(bond.bond_index as usize).copied().unwrap_or(0.0);
            if is_overstressed(bond.stress, health) {
                self.fracture_buffer
                    .push(BondFractureData::new(bond.bond_index, bond.node0, bond.node1, health));
            }
        }
        if !self.fracture_buffer.is_empty() {
            let bond_count = self.fracture_buffer.len() as u32;
            self.publish(self.frame_count, StressEventKind::Fractured { actor: None, bond_count });
        }
        &self.fracture_buffer
    }

    /// One command batch per active actor that has overstressed bonds,
    /// ordered by actor id.
    pub fn generate_fracture_commands_per_actor(&mut self, bond_healths: &[f32]) -> Vec<ActorFractureCommands> {
        if self.processor.overstressed_bond_count() == 0 {
            return Vec::new();
        }

        let mut actors: Vec<ActorId> = self.actors.keys().copied().collect();
        actors.sort_unstable();

        let mut batches = Vec::new();
        for actor in actors {
            let mut commands = Vec::new();
            fill_fracture_commands(
                &self.graph,
                &self.processor,
                &self.actors[&actor],
                bond_healths,
                &mut commands,
            );
            if !commands.is_empty() {
                batches.push(ActorFractureCommands { actor, commands });
            }
        }

        for batch in &batches {
            let bond_count = batch.commands.len() as u32;
            self.publish(
                self.frame_count,
                StressEventKind::Fractured {
                    actor: Some(batch.actor.0),
                    bond_count,
                },
            );
        }
        batches
    }

    // ─── Debug render ────────────────────────────────────────

    /// Lines for every solver bond touching one of `nodes`.
    ///
    /// Empty while actor changes are pending, since the solver graph does
    /// not match the family yet.
    pub fn fill_debug_render(&mut self, nodes: &[u32], mode: DebugRenderMode, scale: f32) -> &[DebugLine] {
        self.debug_lines.clear();
        if self.is_dirty || !self.processor.sync_state().is_clean() {
            return &self.debug_lines;
        }

        self.solver_node_mask.clear();
        self.solver_node_mask
            .resize(self.processor.solver_node_count() as usize, false);
        for &node in nodes {
            let solver_node = self.processor.node_data(node).solver_node;
            self.solver_node_mask[solver_node as usize] = true;
        }

        let linear_color = pack_color(IMPULSE_LINEAR_COLOR);
        let angular_color = pack_color(IMPULSE_ANGULAR_COLOR);

        for i in 0..self.processor.solver_bond_count() {
            let bond = self.processor.solver_internal_bond_data(i);
            if !self.solver_node_mask[bond.node0 as usize] && !self.solver_node_mask[bond.node1 as usize] {
                continue;
            }

            let p0 = self.processor.solver_node_data(bond.node0).local_pos;
            let p1 = self.processor.solver_node_data(bond.node1).local_pos;
            let stress = self.processor.solver_bond_stress(i, &self.settings);
            self.debug_lines.push(DebugLine::new(p0, p1, stress_color(stress)));

            match mode {
                DebugRenderMode::StressGraph => {}
                DebugRenderMode::StressGraphNodesImpulses => {
                    let node0 = self.processor.solver_internal_node_data(bond.node0);
                    let node1 = self.processor.solver_internal_node_data(bond.node1);
                    self.debug_lines.extend([
                        DebugLine::new(p0, p0 + node0.velocity_linear * scale, linear_color),
                        DebugLine::new(p0, p0 + node0.velocity_angular * scale, angular_color),
                        DebugLine::new(p1, p1 + node1.velocity_linear * scale, linear_color),
                        DebugLine::new(p1, p1 + node1.velocity_angular * scale, angular_color),
                    ]);
                }
                DebugRenderMode::StressGraphBondsImpulses => {
                    let center = (p0 + p1) * 0.5;
                    self.debug_lines.extend([
                        DebugLine::new(center, center + bond.impulse_linear * scale, linear_color),
                        DebugLine::new(center, center + bond.impulse_angular * scale, angular_color),
                    ]);
                }
            }
        }
        &self.debug_lines
    }

    // ─── Queries ─────────────────────────────────────────────

    pub fn overstressed_bond_count(&self) -> u32 {
        self.processor.overstressed_bond_count()
    }

    /// Stress of an asset bond from the last update.
    pub fn bond_stress(&self, bond_index: u32) -> f32 {
        self.processor.bond_stress(bond_index)
    }

    pub fn stress_error_linear(&self) -> f32 {
        self.error_linear
    }

    pub fn stress_error_angular(&self) -> f32 {
        self.error_angular
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Number of solver bonds after aggregation.
    pub fn bond_count(&self) -> u32 {
        self.processor.solver_bond_count()
    }

    /// Relaxation passes the current solver graph gets per update.
    pub fn iterations_per_frame(&self) -> u32 {
        self.settings
            .iterations_per_frame(self.processor.solver_bond_count())
    }

    pub fn sync_stats(&self) -> SyncStats {
        self.processor.stats()
    }

    pub fn graph(&self) -> &SupportGraph {
        &self.graph
    }

    pub fn processor(&self) -> &SupportGraphProcessor {
        &self.processor
    }

    fn publish(&mut self, frame: u32, kind: StressEventKind) {
        if let Some(bus) = self.events.as_mut() {
            bus.emit(StressEvent::new(frame, kind));
            bus.flush();
        }
    }
}

/// Appends a command for every overstressed bond leaving `nodes`.
fn fill_fracture_commands(
    graph: &SupportGraph,
    processor: &SupportGraphProcessor,
    nodes: &[u32],
    bond_healths: &[f32],
    out: &mut Vec<BondFractureData>,
) {
    if nodes.len() <= 1 || processor.overstressed_bond_count() == 0 {
        return;
    }
    for &node0 in nodes {
        for (node1, bond_index) in graph.neighbors(node0) {
            if node0 >= node1 {
                continue;
            }
            let health = bond_healths.get(bond_index as usize).copied().unwrap_or(0.0);
            if is_overstressed(processor.bond_stress(bond_index), health) {
                out.push(BondFractureData::new(bond_index, node0, node1, health));
            }
        }
    }
}
