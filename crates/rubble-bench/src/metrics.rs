//! Benchmark metrics: data collected during a benchmark run.

use serde::{Deserialize, Serialize};

/// Metrics collected from a benchmark scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Support graph nodes, world node included.
    pub node_count: u32,
    /// Asset bonds.
    pub bond_count: u32,
    /// Frames executed.
    pub frames: u32,
    /// Total wall-clock time (seconds).
    pub total_wall_time: f64,
    /// Average wall-clock time per frame (seconds).
    pub avg_frame_time: f64,
    pub min_frame_time: f64,
    pub max_frame_time: f64,
    /// Solver bonds after the last frame.
    pub final_solver_bonds: u32,
    /// Bonds broken over the whole run.
    pub fractured_bonds: u32,
    /// Multi-node actors at the end of the run.
    pub final_actor_count: u32,
    /// Linear residual of the last frame.
    pub final_error_linear: f32,
    /// Full clustering passes over the run.
    pub node_resyncs: u32,
    /// External bonds removed without a resync.
    pub surgical_removals: u32,
}

impl BenchmarkMetrics {
    /// CSV header row.
    pub fn to_csv_header() -> String {
        "scenario,node_count,bond_count,frames,total_wall_time_s,avg_frame_ms,min_frame_ms,max_frame_ms,final_solver_bonds,fractured_bonds,final_actors,final_error_linear,node_resyncs,surgical_removals".to_string()
    }

    /// Format this metrics instance as a CSV data row.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{:.6},{:.4},{:.4},{:.4},{},{},{},{:.6e},{},{}",
            self.scenario,
            self.node_count,
            self.bond_count,
            self.frames,
            self.total_wall_time,
            self.avg_frame_time * 1000.0,
            self.min_frame_time * 1000.0,
            self.max_frame_time * 1000.0,
            self.final_solver_bonds,
            self.fractured_bonds,
            self.final_actor_count,
            self.final_error_linear,
            self.node_resyncs,
            self.surgical_removals,
        )
    }

    /// Format multiple metrics as a complete CSV string.
    pub fn to_csv(metrics: &[BenchmarkMetrics]) -> String {
        let mut csv = Self::to_csv_header();
        for m in metrics {
            csv.push('\n');
            csv.push_str(&m.to_csv_row());
        }
        csv
    }
}
