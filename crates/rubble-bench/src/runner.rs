//! Benchmark runner: drives a stress solver through a scenario's frames.
//!
//! Each frame loads every actor, runs one update, applies the generated
//! fracture commands to the health array and re-splits the family into
//! islands when anything broke.

use std::time::Instant;

use rubble_stress::{BondFractureData, StressSolver};
use rubble_telemetry::EventBus;
use rubble_types::{ActorId, RubbleResult};

use crate::islands::live_islands;
use crate::metrics::BenchmarkMetrics;
use crate::scenarios::{Scenario, ScenarioKind};

/// Runs benchmark scenarios and collects metrics.
pub struct BenchmarkRunner;

impl BenchmarkRunner {
    /// Run a single scenario.
    pub fn run(scenario: &Scenario) -> RubbleResult<BenchmarkMetrics> {
        Self::run_with_bus(scenario, None)
    }

    /// Run a single scenario, publishing solver events to `bus`.
    pub fn run_with_bus(scenario: &Scenario, bus: Option<EventBus>) -> RubbleResult<BenchmarkMetrics> {
        let structure = &scenario.structure;
        let mut healths = structure.bond_healths.clone();

        let mut solver = StressSolver::new(structure.graph.clone(), &healths, scenario.settings)?;
        if let Some(bus) = bus {
            solver = solver.with_event_bus(bus);
        }
        solver.set_all_nodes_info_from_chunks(&structure.chunks, &healths, scenario.density);

        let mut actors = Vec::new();
        split_actors(&mut solver, &healths, &mut actors);

        let center = scenario.center_of_mass();
        let spinning = scenario.angular_velocity != glam::Vec3::ZERO;
        let mut frame_times = Vec::with_capacity(scenario.frames as usize);
        let mut fractured_bonds = 0u32;

        let total_start = Instant::now();
        for _ in 0..scenario.frames {
            let frame_start = Instant::now();

            for &actor in &actors {
                solver.add_gravity_force(actor, scenario.gravity);
                if spinning {
                    solver.add_angular_velocity(actor, center, scenario.angular_velocity);
                }
            }
            solver.update(&healths);

            let mut broken = 0u32;
            for batch in solver.generate_fracture_commands_per_actor(&healths) {
                broken += apply_fracture_commands(&mut healths, &batch.commands);
            }
            if broken > 0 {
                fractured_bonds += broken;
                split_actors(&mut solver, &healths, &mut actors);
            }

            frame_times.push(frame_start.elapsed().as_secs_f64());
        }
        let total_wall_time = total_start.elapsed().as_secs_f64();

        let avg_frame = if frame_times.is_empty() {
            0.0
        } else {
            frame_times.iter().sum::<f64>() / frame_times.len() as f64
        };
        let min_frame = frame_times.iter().copied().fold(f64::MAX, f64::min);
        let max_frame = frame_times.iter().copied().fold(0.0, f64::max);
        let stats = solver.sync_stats();

        tracing::info!(
            scenario = scenario.kind.name(),
            frames = scenario.frames,
            fractured_bonds,
            actors = actors.len(),
            "benchmark finished"
        );

        Ok(BenchmarkMetrics {
            scenario: scenario.kind.name().to_string(),
            node_count: structure.graph.node_count(),
            bond_count: structure.bond_healths.len() as u32,
            frames: scenario.frames,
            total_wall_time,
            avg_frame_time: avg_frame,
            min_frame_time: if frame_times.is_empty() { 0.0 } else { min_frame },
            max_frame_time: max_frame,
            final_solver_bonds: solver.bond_count(),
            fractured_bonds,
            final_actor_count: actors.len() as u32,
            final_error_linear: solver.stress_error_linear(),
            node_resyncs: stats.node_resyncs,
            surgical_removals: stats.surgical_removals,
        })
    }

    /// Run all scenarios and return metrics for each.
    pub fn run_all() -> RubbleResult<Vec<BenchmarkMetrics>> {
        ScenarioKind::all()
            .iter()
            .map(|&kind| Self::run(&Scenario::from_kind(kind)))
            .collect()
    }
}

/// Subtracts each command's health from its bond and returns how many
/// bonds this broke.
pub fn apply_fracture_commands(bond_healths: &mut [f32], commands: &[BondFractureData]) -> u32 {
    let mut broken = 0;
    for command in commands {
        let Some(health) = bond_healths.get_mut(command.bond_index as usize) else {
            continue;
        };
        if *health <= 0.0 {
            continue;
        }
        *health -= command.health;
        if *health <= 0.0 {
            broken += 1;
        }
    }
    broken
}

/// Replaces every registered actor with one actor per live island.
///
/// Actor ids are the smallest node of each island, so they are stable
/// for islands that did not change.
fn split_actors(solver: &mut StressSolver, bond_healths: &[f32], actors: &mut Vec<ActorId>) {
    for actor in actors.drain(..) {
        solver.notify_actor_destroyed(actor);
    }
    for island in live_islands(solver.graph(), bond_healths) {
        let actor = ActorId(island[0]);
        if solver.notify_actor_created(actor, &island) {
            actors.push(actor);
        }
    }
    tracing::debug!(actors = actors.len(), "family split into islands");
}
