//! Integration tests for rubble-stress.

use glam::Vec3;
use rubble_solver::sync::SyncState;
use rubble_stress::debug_render::{pack_color, stress_color, IMPULSE_ANGULAR_COLOR, IMPULSE_LINEAR_COLOR};
use rubble_stress::generators::{chain, tower, wall};
use rubble_stress::support_graph::SupportGraph;
use rubble_stress::{
    BondFractureData, DebugRenderMode, ForceMode, StressSolver, StressSolverSettings,
};
use rubble_telemetry::{EventBus, StressEventKind, VecSink};
use rubble_types::{ActorId, RubbleError};

/// Hardness 2, linear factor 1, four passes for a single solver bond.
fn threshold_settings() -> StressSolverSettings {
    StressSolverSettings {
        hardness: 2.0,
        stress_linear_factor: 1.0,
        stress_angular_factor: 0.75,
        bond_iterations_per_frame: 8,
        graph_reduction_level: 0,
    }
}

/// Static node 0 holding dynamic node 1 one unit below.
fn hanging_pair(health: f32) -> (StressSolver, Vec<f32>) {
    let graph = SupportGraph::from_edges(vec![0, 1], &[(0, 1, 0)]);
    let healths = vec![health];
    let mut solver = StressSolver::new(graph, &healths, threshold_settings()).unwrap();
    solver.set_node_info(0, 0.0, 0.0, Vec3::ZERO, true);
    solver.set_node_info(1, 1.0, 1.0, Vec3::new(0.0, -1.0, 0.0), false);
    assert!(solver.notify_actor_created(ActorId(1), &[0, 1]));
    (solver, healths)
}

fn wall_solver(columns: u32, rows: u32, settings: StressSolverSettings) -> (StressSolver, rubble_stress::generators::Structure) {
    let structure = wall(columns, rows, 1.0, 1_000.0);
    let mut solver =
        StressSolver::new(structure.graph.clone(), &structure.bond_healths, settings).unwrap();
    solver.set_all_nodes_info_from_chunks(&structure.chunks, &structure.bond_healths, 1.0);
    assert!(solver.notify_actor_created(ActorId(0), &structure.all_nodes()));
    (solver, structure)
}

// ─── Support Graph Tests ──────────────────────────────────────

#[test]
fn from_edges_lists_both_directions() {
    let graph = SupportGraph::from_edges(vec![0, 1, 2], &[(0, 1, 0), (1, 2, 1)]);
    assert_eq!(graph.adjacency_partition, vec![0, 1, 3, 4]);
    assert_eq!(graph.neighbors(1).collect::<Vec<_>>(), vec![(0, 0), (2, 1)]);
    assert_eq!(graph.bonds().collect::<Vec<_>>(), vec![(0, 1, 0), (1, 2, 1)]);
    assert_eq!(graph.bond_count(), 2);
    graph.validate().unwrap();
}

#[test]
fn validate_rejects_one_sided_bond() {
    let mut graph = SupportGraph::from_edges(vec![0, 1], &[(0, 1, 0)]);
    graph.adjacent_bond_indices[1] = 5;
    assert!(matches!(graph.validate(), Err(RubbleError::InvalidGraph(_))));
}

#[test]
fn validate_rejects_bad_partition() {
    let mut graph = SupportGraph::from_edges(vec![0, 1], &[(0, 1, 0)]);
    graph.adjacency_partition.pop();
    assert!(graph.validate().is_err());
}

#[test]
fn validate_rejects_out_of_range_neighbor() {
    let mut graph = SupportGraph::from_edges(vec![0, 1], &[(0, 1, 0)]);
    graph.adjacent_node_indices[0] = 9;
    assert!(matches!(
        graph.validate(),
        Err(RubbleError::IndexOutOfRange { kind: "node", index: 9, .. })
    ));
}

#[test]
fn solver_rejects_short_health_array() {
    let graph = SupportGraph::from_edges(vec![0, 1, 2], &[(0, 1, 0), (1, 2, 1)]);
    let result = StressSolver::new(graph, &[1.0], StressSolverSettings::default());
    assert!(result.is_err());
}

#[test]
fn support_graph_json_roundtrip() {
    let graph = wall(2, 2, 1.0, 1.0).graph;
    let json = serde_json::to_string(&graph).unwrap();
    let recovered: SupportGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered, graph);
}

// ─── Generator Tests ──────────────────────────────────────────

#[test]
fn wall_layout() {
    let s = wall(4, 3, 0.5, 10.0);
    assert_eq!(s.chunks.len(), 12);
    assert_eq!(s.graph.node_count(), 13);
    // 3×3 horizontal + 4×2 vertical + 4 to the world
    assert_eq!(s.bond_healths.len(), 21);
    assert_eq!(s.world_node(), 12);
    assert!(s.bond_between(s.node_index(1, 0, 0), s.world_node()).is_some());
    assert!(s.bond_between(s.node_index(1, 1, 0), s.world_node()).is_none());
    assert_eq!(s.chunks[s.node_index(1, 2, 0) as usize].centroid, Vec3::new(0.75, 1.25, 0.25));
    s.graph.validate().unwrap();
}

#[test]
fn chain_hangs_below_anchor() {
    let s = chain(5, 1.0, 1.0);
    assert_eq!(s.bond_healths.len(), 5);
    assert!(s.chunks[4].centroid.y < s.chunks[0].centroid.y);
    assert!(s.bond_between(0, s.world_node()).is_some());
    s.graph.validate().unwrap();
}

#[test]
fn tower_layout() {
    let s = tower(2, 3, 2, 1.0, 1.0);
    assert_eq!(s.chunks.len(), 12);
    // x: 1×3×2, y: 2×2×2, z: 2×3×1, world: 2×2
    assert_eq!(s.bond_healths.len(), 6 + 8 + 6 + 4);
    s.graph.validate().unwrap();
}

// ─── Node Info & Actors ───────────────────────────────────────

#[test]
fn nodes_from_chunks_mark_world_connected_static() {
    let s = wall(3, 3, 2.0, 1.0);
    let mut solver = StressSolver::new(s.graph.clone(), &s.bond_healths, StressSolverSettings::default()).unwrap();
    solver.set_all_nodes_info_from_chunks(&s.chunks, &s.bond_healths, 0.5);

    let world = solver.processor().node_data(s.world_node());
    assert!(world.is_static);
    assert_eq!(world.mass, 0.0);

    let ground = solver.processor().node_data(s.node_index(1, 0, 0));
    assert!(ground.is_static);

    let upper = solver.processor().node_data(s.node_index(1, 2, 0));
    assert!(!upper.is_static);
    assert_eq!(upper.mass, 8.0 * 0.5);
    assert_eq!(upper.volume, 8.0);
}

#[test]
fn dead_world_bond_does_not_anchor() {
    let s = wall(2, 2, 1.0, 1.0);
    let mut healths = s.bond_healths.clone();
    let ground = s.node_index(0, 0, 0);
    let anchor = s.bond_between(ground, s.world_node()).unwrap();
    healths[anchor as usize] = 0.0;

    let mut solver = StressSolver::new(s.graph.clone(), &healths, StressSolverSettings::default()).unwrap();
    solver.set_all_nodes_info_from_chunks(&s.chunks, &healths, 1.0);
    assert!(!solver.processor().node_data(ground).is_static);
    assert!(!solver.processor().contains_bond(anchor));
}

#[test]
fn single_node_actor_is_ignored() {
    let (mut solver, _) = hanging_pair(1.0);
    assert!(!solver.notify_actor_created(ActorId(7), &[1]));
    assert_eq!(solver.actor_count(), 1);
    assert!(!solver.add_gravity_force(ActorId(7), Vec3::NEG_Y));
}

#[test]
fn destroyed_actor_takes_no_forces() {
    let (mut solver, _) = hanging_pair(1.0);
    solver.notify_actor_destroyed(ActorId(1));
    assert_eq!(solver.actor_count(), 0);
    assert!(!solver.add_force(ActorId(1), Vec3::ZERO, Vec3::X, ForceMode::Impulse));
}

// ─── Forces ───────────────────────────────────────────────────

#[test]
fn positional_force_hits_nearest_node() {
    let (mut solver, s) = wall_solver(3, 3, StressSolverSettings::default());
    let target = s.node_index(2, 1, 0);
    let position = s.chunks[target as usize].centroid + Vec3::new(0.1, 0.0, 0.0);
    assert!(solver.add_force(ActorId(0), position, Vec3::X * 5.0, ForceMode::Impulse));
    assert_eq!(solver.processor().node_data(target).impulse, Vec3::X * 5.0);
    assert_eq!(solver.processor().node_data(s.node_index(1, 1, 0)).impulse, Vec3::ZERO);
}

#[test]
fn gravity_scales_with_mass() {
    let (mut solver, s) = wall_solver(2, 2, StressSolverSettings::default());
    assert!(solver.add_gravity_force(ActorId(0), Vec3::new(0.0, -10.0, 0.0)));
    let node = solver.processor().node_data(s.node_index(0, 1, 0));
    assert_eq!(node.impulse, Vec3::new(0.0, -10.0 * node.mass, 0.0));
    // The world node is massless.
    assert_eq!(solver.processor().node_data(s.world_node()).impulse, Vec3::ZERO);
}

#[test]
fn angular_velocity_pulls_outward() {
    let graph = SupportGraph::from_edges(vec![0, 1], &[(0, 1, 0)]);
    let mut solver = StressSolver::new(graph, &[1.0], StressSolverSettings::default()).unwrap();
    solver.set_node_info(0, 2.0, 1.0, Vec3::new(-1.0, 0.0, 0.0), false);
    solver.set_node_info(1, 2.0, 1.0, Vec3::new(1.0, 0.0, 0.0), false);
    solver.notify_actor_created(ActorId(0), &[0, 1]);

    assert!(solver.add_angular_velocity(ActorId(0), Vec3::ZERO, Vec3::Z));
    // ω × (ω × r) with ω = Z, r = ±X gives ∓X, scaled by mass 2.
    assert_eq!(solver.processor().node_data(0).impulse, Vec3::new(2.0, 0.0, 0.0));
    assert_eq!(solver.processor().node_data(1).impulse, Vec3::new(-2.0, 0.0, 0.0));
}

// ─── Update ───────────────────────────────────────────────────

#[test]
fn hanging_pair_breaks_at_threshold() {
    let (mut solver, healths) = hanging_pair(1.0);
    assert_eq!(solver.iterations_per_frame(), 8);
    assert!(solver.add_gravity_force(ActorId(1), Vec3::new(0.0, -2.0, 0.0)));
    solver.update(&healths);

    assert_eq!(solver.iterations_per_frame(), 4);
    assert!(solver.stress_error_linear() < 1e-4);
    assert!((solver.bond_stress(0) - 1.0).abs() < 1e-6);
    assert_eq!(solver.overstressed_bond_count(), 1);

    let commands = solver.generate_fracture_commands(&healths);
    assert_eq!(commands, &[BondFractureData::new(0, 0, 1, 1.0)]);
    assert_eq!(commands[0].bond_index, 0);
}

#[test]
fn sturdy_bond_survives() {
    let (mut solver, healths) = hanging_pair(1.5);
    solver.add_gravity_force(ActorId(1), Vec3::new(0.0, -2.0, 0.0));
    solver.update(&healths);
    assert_eq!(solver.overstressed_bond_count(), 0);
    assert!(solver.generate_fracture_commands(&healths).is_empty());
    assert!(solver.generate_fracture_commands_per_actor(&healths).is_empty());
}

#[test]
fn warm_start_keeps_steady_load() {
    let (mut solver, healths) = hanging_pair(1.0);
    for _ in 0..3 {
        solver.add_gravity_force(ActorId(1), Vec3::new(0.0, -2.0, 0.0));
        solver.update(&healths);
        assert!((solver.bond_stress(0) - 1.0).abs() < 1e-6);
    }
    assert_eq!(solver.frame_count(), 3);
}

#[test]
fn reset_restarts_frame_count() {
    let (mut solver, healths) = hanging_pair(1.0);
    solver.update(&healths);
    solver.update(&healths);
    assert_eq!(solver.frame_count(), 2);
    solver.reset();
    assert_eq!(solver.frame_count(), 2);
    solver.update(&healths);
    assert_eq!(solver.frame_count(), 1);
}

#[test]
fn unloaded_structure_has_no_stress() {
    let (mut solver, s) = wall_solver(3, 3, StressSolverSettings::default());
    solver.update(&s.bond_healths);
    for bond in 0..s.bond_healths.len() as u32 {
        assert_eq!(solver.bond_stress(bond), 0.0);
    }
    assert_eq!(solver.overstressed_bond_count(), 0);
}

#[test]
fn gravity_loads_bonds_to_ground() {
    let settings = StressSolverSettings {
        graph_reduction_level: 0,
        ..StressSolverSettings::default()
    };
    let (mut solver, s) = wall_solver(3, 3, settings);
    solver.add_gravity_force(ActorId(0), Vec3::new(0.0, -10.0, 0.0));
    solver.update(&s.bond_healths);

    let loaded = s.bond_between(s.node_index(1, 0, 0), s.node_index(1, 1, 0)).unwrap();
    assert!(solver.bond_stress(loaded) > 0.0);
    // Both ends static: never solved.
    let grounded = s.bond_between(s.node_index(0, 0, 0), s.node_index(1, 0, 0)).unwrap();
    assert_eq!(solver.bond_stress(grounded), 0.0);
}

#[test]
fn dead_bonds_leave_on_next_update() {
    let (mut solver, s) = wall_solver(3, 3, StressSolverSettings::default());
    solver.update(&s.bond_healths);

    let mut healths = s.bond_healths.clone();
    let cut = s.bond_between(s.node_index(0, 1, 0), s.node_index(0, 2, 0)).unwrap();
    healths[cut as usize] = 0.0;

    // The family did not split; the bond still has to go.
    solver.update(&healths);
    assert!(!solver.processor().contains_bond(cut));
    solver.processor().validate_integrity().unwrap();
}

#[test]
fn dead_cycle_bond_leaves_without_actor_change() {
    let (mut solver, s) = wall_solver(2, 2, StressSolverSettings::debug());
    solver.add_gravity_force(ActorId(0), Vec3::NEG_Y);
    solver.update(&s.bond_healths);
    assert_eq!(solver.processor().bond_count(), 6);

    let mut healths = s.bond_healths.clone();
    let cut = s.bond_between(s.node_index(0, 1, 0), s.node_index(1, 1, 0)).unwrap();
    healths[cut as usize] = 0.0;
    for _ in 0..2 {
        solver.add_gravity_force(ActorId(0), Vec3::NEG_Y);
        solver.update(&healths);
    }

    assert!(!solver.processor().contains_bond(cut));
    assert_eq!(solver.processor().bond_count(), 5);
    assert_eq!(solver.bond_stress(cut), 0.0);
    assert_eq!(solver.actor_count(), 1);
    solver.processor().validate_integrity().unwrap();
}

#[test]
fn reduction_level_change_applies_on_update() {
    let (mut solver, s) = wall_solver(4, 4, StressSolverSettings::debug());
    solver.update(&s.bond_healths);
    assert_eq!(solver.processor().graph_reduction_level(), 0);
    let fine = solver.bond_count();

    let mut settings = *solver.settings();
    settings.graph_reduction_level = 2;
    solver.set_settings(settings).unwrap();
    solver.update(&s.bond_healths);
    assert_eq!(solver.processor().graph_reduction_level(), 2);
    assert_eq!(solver.processor().sync_state(), SyncState::Clean);
    assert!(solver.bond_count() < fine);
    solver.processor().validate_integrity().unwrap();
}

#[test]
fn set_settings_rejects_invalid() {
    let (mut solver, _) = hanging_pair(1.0);
    let bad = StressSolverSettings {
        hardness: -1.0,
        ..Default::default()
    };
    assert!(solver.set_settings(bad).is_err());
    assert_eq!(solver.settings().hardness, 2.0);
}

// ─── Fracture Commands ────────────────────────────────────────

/// Two independent hanging pairs, only the first one weak enough to break.
fn two_pairs() -> (StressSolver, Vec<f32>) {
    let graph = SupportGraph::from_edges(vec![0, 1, 2, 3], &[(0, 1, 0), (2, 3, 1)]);
    let healths = vec![1.0, 10.0];
    let mut solver = StressSolver::new(graph, &healths, threshold_settings()).unwrap();
    for (anchor, hanging) in [(0, 1), (2, 3)] {
        let x = anchor as f32;
        solver.set_node_info(anchor, 0.0, 0.0, Vec3::new(x, 0.0, 0.0), true);
        solver.set_node_info(hanging, 1.0, 1.0, Vec3::new(x, -1.0, 0.0), false);
    }
    solver.notify_actor_created(ActorId(10), &[0, 1]);
    solver.notify_actor_created(ActorId(20), &[2, 3]);
    solver.add_gravity_force(ActorId(10), Vec3::new(0.0, -2.0, 0.0));
    solver.add_gravity_force(ActorId(20), Vec3::new(0.0, -2.0, 0.0));
    solver.update(&healths);
    (solver, healths)
}

#[test]
fn per_actor_commands_only_for_broken_actors() {
    let (mut solver, healths) = two_pairs();
    assert_eq!(solver.overstressed_bond_count(), 1);

    let batches = solver.generate_fracture_commands_per_actor(&healths);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].actor, ActorId(10));
    assert_eq!(batches[0].commands, vec![BondFractureData::new(0, 0, 1, 1.0)]);

    assert!(solver.generate_fracture_commands_for_actor(ActorId(20), &healths).is_empty());
    assert_eq!(solver.generate_fracture_commands_for_actor(ActorId(10), &healths).len(), 1);
    assert_eq!(solver.generate_fracture_commands(&healths).len(), 1);
}

#[test]
fn parallel_bonds_get_separate_commands() {
    // Bonds 0 and 1 both hold node 1 under node 0.
    let graph = SupportGraph::from_edges(vec![0, 1], &[(0, 1, 0), (0, 1, 1)]);
    let healths = vec![0.5, 0.9];
    let mut solver = StressSolver::new(graph, &healths, threshold_settings()).unwrap();
    solver.set_node_info(0, 0.0, 0.0, Vec3::ZERO, true);
    solver.set_node_info(1, 1.0, 1.0, Vec3::new(0.0, -1.0, 0.0), false);
    solver.notify_actor_created(ActorId(1), &[0, 1]);
    solver.add_gravity_force(ActorId(1), Vec3::new(0.0, -4.0, 0.0));
    solver.update(&healths);
    assert_eq!(solver.overstressed_bond_count(), 2);

    let expected = vec![
        BondFractureData::new(0, 0, 1, 0.5),
        BondFractureData::new(1, 0, 1, 0.9),
    ];
    let by_bond = |commands: &[BondFractureData]| {
        let mut commands = commands.to_vec();
        commands.sort_by_key(|c| c.bond_index);
        commands
    };
    assert_eq!(by_bond(solver.generate_fracture_commands(&healths)), expected);
    assert_eq!(
        by_bond(solver.generate_fracture_commands_for_actor(ActorId(1), &healths)),
        expected
    );
}

#[test]
fn fracture_commands_skip_dead_bonds() {
    let (mut solver, mut healths) = two_pairs();
    healths[0] = 0.0;
    assert!(solver.generate_fracture_commands(&healths).is_empty());
    assert!(solver.generate_fracture_commands_for_actor(ActorId(10), &healths).is_empty());
}

// ─── Debug Render ─────────────────────────────────────────────

#[test]
fn stress_color_ramp_endpoints() {
    assert_eq!(stress_color(0.0), 0xFFFF_FF00);
    assert_eq!(stress_color(1.0), 0xFF00_00FF);
    assert_eq!(stress_color(0.5), 0xFF00_FFFF);
    // Overload saturates at red.
    assert_eq!(stress_color(7.0), stress_color(1.0));
}

#[test]
fn impulse_line_colors() {
    assert_eq!(pack_color(IMPULSE_LINEAR_COLOR), 0xFF00_FF00);
    assert_eq!(pack_color(IMPULSE_ANGULAR_COLOR), 0xFF00_00FF);
}

#[test]
fn debug_render_line_counts() {
    let (mut solver, s) = wall_solver(3, 3, StressSolverSettings::debug());
    solver.add_gravity_force(ActorId(0), Vec3::NEG_Y);
    solver.update(&s.bond_healths);
    let solver_bonds = solver.bond_count() as usize;
    assert!(solver_bonds > 0);

    let nodes = s.all_nodes();
    assert_eq!(solver.fill_debug_render(&nodes, DebugRenderMode::StressGraph, 1.0).len(), solver_bonds);
    assert_eq!(
        solver.fill_debug_render(&nodes, DebugRenderMode::StressGraphBondsImpulses, 1.0).len(),
        solver_bonds * 3
    );
    assert_eq!(
        solver.fill_debug_render(&nodes, DebugRenderMode::StressGraphNodesImpulses, 1.0).len(),
        solver_bonds * 5
    );
    assert!(solver.fill_debug_render(&[], DebugRenderMode::StressGraph, 1.0).is_empty());
}

#[test]
fn debug_render_empty_while_dirty() {
    let (mut solver, s) = wall_solver(2, 2, StressSolverSettings::debug());
    solver.update(&s.bond_healths);
    solver.notify_actor_created(ActorId(0), &s.all_nodes());
    assert!(solver.fill_debug_render(&s.all_nodes(), DebugRenderMode::StressGraph, 1.0).is_empty());
}

// ─── Telemetry ────────────────────────────────────────────────

#[test]
fn update_publishes_events() {
    let sink = VecSink::new();
    let (solver, healths) = hanging_pair(1.0);
    let mut solver = solver.with_event_bus(EventBus::new().with_sink(sink.clone()));

    solver.add_gravity_force(ActorId(1), Vec3::new(0.0, -2.0, 0.0));
    solver.update(&healths);
    solver.generate_fracture_commands(&healths);
    solver.reset();

    let events = sink.events();
    assert!(matches!(events[0].kind, StressEventKind::GraphResynced { node_resyncs: 1, .. }));
    assert!(matches!(
        events[1].kind,
        StressEventKind::FrameSolved { overstressed: 1, solver_bonds: 1, .. }
    ));
    assert_eq!(events[1].frame, 0);
    assert!(matches!(
        events[2].kind,
        StressEventKind::Fractured { actor: None, bond_count: 1 }
    ));
    assert_eq!(events[3].kind, StressEventKind::Reset);
    assert_eq!(events.len(), 4);
}

#[test]
fn stress_solver_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<StressSolver>();
}
