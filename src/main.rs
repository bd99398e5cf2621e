// src/main.rs
//! Maze Runners Controller
//!
//! Creates the shared arena for a maze, launches one runner process per
//! placement slot, and reports how the runners fared.

use anyhow::{Context, Result};
use clap::Parser;
use maze_runners::observability::init_tracing;
use maze_runners::runtime::controller::Controller;
use maze_runners::utils::config::SimulationConfig;
use maze_runners::SharedArena;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "maze-controller", version, about = "Run concurrent maze runners over shared memory")]
struct Cli {
    /// Maze file (defaults to the configured maze, data/maze0.txt)
    maze: Option<PathBuf>,

    /// Number of runner processes
    #[arg(long)]
    runners: Option<usize>,

    /// Pause between runner steps in milliseconds
    #[arg(long = "step-ms")]
    step_ms: Option<u64>,

    /// Fixed RNG seed for placement and runner walks
    #[arg(long)]
    seed: Option<u64>,

    /// Exit once every runner has finished instead of waiting for ENTER
    #[arg(long)]
    no_wait: bool,

    /// Unlink an arena left behind by a crashed run before starting
    #[arg(long)]
    reclaim: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(maze) = &self.maze {
            config.simulation.maze_path = maze.clone();
        }
        if let Some(runners) = self.runners {
            config.simulation.runners = runners;
        }
        if let Some(step_ms) = self.step_ms {
            config.runner.step_interval_ms = step_ms;
        }
        if let Some(seed) = self.seed {
            config.runner.seed = Some(seed);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SimulationConfig::load().context("loading configuration")?;
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(&config.logging)?;
    info!("Starting maze controller v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {:?}", config);

    if cli.reclaim {
        match SharedArena::destroy_location(&config.arena_location()) {
            Ok(()) => warn!("Removed leftover arena '{}'", config.arena.name),
            Err(e) => info!("Nothing to reclaim: {}", e),
        }
    }

    let report = Controller::new(config).run(!cli.no_wait).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if report.failed_to_start > 0 || report.failed > 0 {
        std::process::exit(maze_runners::exit_codes::FAILED);
    }
    Ok(())
}
