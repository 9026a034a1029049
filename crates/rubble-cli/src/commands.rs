//! CLI command implementations.

use rubble_bench::metrics::BenchmarkMetrics;
use rubble_bench::runner::BenchmarkRunner;
use rubble_bench::scenarios::{Scenario, ScenarioConfig, ScenarioKind};
use rubble_stress::SupportGraph;
use rubble_telemetry::{EventBus, TracingSink};

/// Run a scenario from a TOML config file.
pub fn simulate(config_path: &str, output_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Rubble Simulation");
    println!("─────────────────");
    println!("Config: {config_path}");
    println!();

    let content = std::fs::read_to_string(config_path)?;
    let config: ScenarioConfig = toml::from_str(&content)?;
    let scenario = config.into_scenario()?;

    println!(
        "Running: {} ({} nodes, {} bonds, {} frames, reduction level {})",
        scenario.kind.name(),
        scenario.structure.graph.node_count(),
        scenario.structure.bond_healths.len(),
        scenario.frames,
        scenario.settings.graph_reduction_level,
    );

    let bus = EventBus::new().with_sink(TracingSink::new(tracing::Level::DEBUG));
    let metrics = BenchmarkRunner::run_with_bus(&scenario, Some(bus))
        .map_err(|e| format!("Simulation failed: {e}"))?;

    print_summary(&metrics);
    write_csv(&[metrics], output_path)
}

/// Run the benchmark suite.
pub fn benchmark(
    scenario_name: &str,
    frames: Option<u32>,
    output_path: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Rubble Benchmark Suite");
    println!("══════════════════════");
    println!();

    let kinds: Vec<ScenarioKind> = if scenario_name == "all" {
        ScenarioKind::all().to_vec()
    } else {
        match ScenarioKind::from_name(scenario_name) {
            Some(kind) => vec![kind],
            None => {
                let available: Vec<&str> = ScenarioKind::all().iter().map(|k| k.name()).collect();
                return Err(format!(
                    "Unknown scenario: '{scenario_name}'. Available: {}, all",
                    available.join(", ")
                )
                .into());
            }
        }
    };

    let mut all_metrics = Vec::new();
    for kind in kinds {
        let mut scenario = Scenario::from_kind(kind);
        if let Some(frames) = frames {
            scenario.frames = frames;
        }

        println!(
            "Running: {} ({} nodes, {} bonds, {} frames)",
            kind.name(),
            scenario.structure.graph.node_count(),
            scenario.structure.bond_healths.len(),
            scenario.frames,
        );

        let metrics = BenchmarkRunner::run(&scenario)
            .map_err(|e| format!("Benchmark failed: {e}"))?;
        print_summary(&metrics);
        all_metrics.push(metrics);
    }

    write_csv(&all_metrics, output_path)
}

/// Validate a scenario config or a support graph.
pub fn validate(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Rubble Validator");
    println!("────────────────");
    println!();

    if path.ends_with(".toml") {
        println!("Validating scenario: {path}");
        let content = std::fs::read_to_string(path)?;
        let config: ScenarioConfig = toml::from_str(&content)?;
        let scenario = config.into_scenario()?;
        scenario.structure.graph.validate()?;
        println!("✅ Scenario is valid ({}).", scenario.kind.name());
    } else if path.ends_with(".json") {
        println!("Validating support graph: {path}");
        let content = std::fs::read_to_string(path)?;
        let graph: SupportGraph = serde_json::from_str(&content)?;
        match graph.validate() {
            Ok(()) => println!(
                "✅ Support graph is valid ({} nodes, {} bonds).",
                graph.node_count(),
                graph.bonds().count()
            ),
            Err(e) => println!("❌ Support graph validation failed: {e}"),
        }
    } else {
        println!("Unsupported file format. Use .toml (scenario) or .json (support graph).");
    }

    Ok(())
}

fn print_summary(metrics: &BenchmarkMetrics) {
    println!("  Wall time:       {:.3}s", metrics.total_wall_time);
    println!("  Avg frame:       {:.3}ms", metrics.avg_frame_time * 1000.0);
    println!("  Solver bonds:    {}", metrics.final_solver_bonds);
    println!("  Fractured bonds: {}", metrics.fractured_bonds);
    println!("  Actors:          {}", metrics.final_actor_count);
    println!("  Node resyncs:    {}", metrics.node_resyncs);
    println!();
}

fn write_csv(metrics: &[BenchmarkMetrics], output_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let csv = BenchmarkMetrics::to_csv(metrics);
    if let Some(path) = output_path {
        std::fs::write(path, &csv)?;
        println!("Results written to: {path}");
    } else {
        println!("CSV Output:");
        println!("{csv}");
    }
    Ok(())
}
