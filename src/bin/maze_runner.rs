// src/bin/maze_runner.rs
//! Maze Runner
//!
//! One runner process: attach to the controller's arena, join the registry,
//! and random-walk until the exit is reached or the controller says quit.
//! The exit status reports the outcome (see `maze_runners::exit_codes`).

use clap::Parser;
use maze_runners::exit_codes;
use maze_runners::observability::init_tracing;
use maze_runners::runtime::agent::{AgentConfig, RunnerAgent};
use maze_runners::runtime::dice::RandomDice;
use maze_runners::utils::config::SimulationConfig;
use maze_runners::SharedArena;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "maze-runner", version, about = "One maze runner attached to the controller's arena")]
struct Cli {
    /// Spawn slot assigned by the controller, for matching log lines
    #[arg(long)]
    slot: Option<usize>,
}

fn run(cli: &Cli, config: &SimulationConfig) -> anyhow::Result<i32> {
    let arena = SharedArena::attach(&config.arena_location())?;
    let agent_config = AgentConfig {
        step_interval: config.step_interval(),
        max_steps: config.runner.max_steps,
    };

    let mut agent = RunnerAgent::join(&arena, RandomDice::new(config.runner.seed), agent_config)?;
    info!(
        runner = agent.index(),
        slot = cli.slot,
        pid = std::process::id(),
        "Runner started"
    );

    let outcome = agent.run()?;
    Ok(outcome.exit_code())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match SimulationConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("maze-runner: {}", e);
            return ExitCode::from(exit_codes::FAILED as u8);
        }
    };
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("maze-runner: {:#}", e);
        return ExitCode::from(exit_codes::FAILED as u8);
    }

    match run(&cli, &config) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            error!(slot = cli.slot, pid = std::process::id(), "Runner failed: {:#}", e);
            ExitCode::from(exit_codes::FAILED as u8)
        }
    }
}
