//! Rubble CLI: run stress scenarios, benchmark and validate inputs.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "rubble")]
#[command(version, about = "Rubble: incremental structural stress solver for destructible rigid bodies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario described by a TOML file.
    Simulate {
        /// Path to scenario config (TOML).
        #[arg(short, long, default_value = "scenario.toml")]
        config: String,

        /// Also write the metrics as CSV.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run the benchmark suite.
    Benchmark {
        /// Which scenario to run (wall, hanging_chain, tower, all).
        #[arg(short, long, default_value = "all")]
        scenario: String,

        /// Override the frame count of every scenario.
        #[arg(short, long)]
        frames: Option<u32>,

        /// Output CSV file path.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Validate a scenario config (.toml) or a support graph (.json).
    Validate {
        /// Path to the file.
        path: String,
    },
}

fn main() {
    // RUST_LOG=rubble_solver=debug shows resyncs, =trace every frame.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate { config, output } => commands::simulate(&config, output.as_deref()),
        Commands::Benchmark { scenario, frames, output } => {
            commands::benchmark(&scenario, frames, output.as_deref())
        }
        Commands::Validate { path } => commands::validate(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
