// src/utils/config.rs
//! Layered configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `maze.toml` in the working directory (optional)
//! 3. the file named by `MAZE_CONFIG` (optional)
//! 4. `MAZE_*` environment variables, `__` between section and key
//!    (e.g. `MAZE_ARENA__NAME=demo`, `MAZE_RUNNER__STEP_INTERVAL_MS=250`)

use crate::arena::layout::MAX_RUNNERS;
use crate::arena::shared::ArenaLocation;
use crate::utils::errors::{MazeError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix shared by controller and runners
pub const ENV_PREFIX: &str = "MAZE";

/// Complete simulation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub arena: ArenaConfig,
    pub runner: RunnerConfig,
    pub simulation: ControllerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Shared identifier of the region and its lock
    pub name: String,

    /// Directory holding the region and lock files
    pub dir: PathBuf,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            name: "maze-runners".to_string(),
            dir: default_arena_dir(),
        }
    }
}

fn default_arena_dir() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Pause after every step
    pub step_interval_ms: u64,

    /// Runner executable (defaults to `maze-runner` beside the controller)
    pub binary: Option<PathBuf>,

    /// Fixed RNG seed; each runner process offsets it by its spawn slot
    pub seed: Option<u64>,

    /// Give up after this many steps
    pub max_steps: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: 1000,
            binary: None,
            seed: None,
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub maze_path: PathBuf,

    /// Runners to place and spawn
    pub runners: usize,

    /// How long runners get to notice the quit flag before being killed
    pub shutdown_grace_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            maze_path: PathBuf::from("data/maze0.txt"),
            runners: MAX_RUNNERS,
            shutdown_grace_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl SimulationConfig {
    /// Load from all layered sources
    pub fn load() -> Result<Self> {
        let extra = std::env::var_os("MAZE_CONFIG").map(PathBuf::from);
        Self::load_with(Path::new("maze.toml"), extra.as_deref())
    }

    /// Load with explicit file locations; environment still applies
    pub fn load_with(base: &Path, extra: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(base).required(false));
        if let Some(extra) = extra {
            builder = builder.add_source(File::from(extra).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SimulationConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.arena.name.is_empty() || self.arena.name.contains('/') {
            return Err(MazeError::Config(format!(
                "arena name {:?} must be non-empty and contain no '/'",
                self.arena.name
            )));
        }
        if self.simulation.runners == 0 || self.simulation.runners > MAX_RUNNERS {
            return Err(MazeError::Config(format!(
                "runners must be 1..={}, got {}",
                MAX_RUNNERS, self.simulation.runners
            )));
        }
        if self.runner.max_steps == Some(0) {
            return Err(MazeError::Config("max_steps must be positive".to_string()));
        }
        Ok(())
    }

    pub fn arena_location(&self) -> ArenaLocation {
        ArenaLocation::new(&self.arena.dir, &self.arena.name)
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.runner.step_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.simulation.shutdown_grace_ms)
    }

    /// Environment a spawned runner needs to resolve the same settings
    pub fn runner_env(&self, slot: usize) -> Vec<(String, String)> {
        let mut env = vec![
            ("MAZE_ARENA__NAME".to_string(), self.arena.name.clone()),
            (
                "MAZE_ARENA__DIR".to_string(),
                self.arena.dir.display().to_string(),
            ),
            (
                "MAZE_RUNNER__STEP_INTERVAL_MS".to_string(),
                self.runner.step_interval_ms.to_string(),
            ),
            ("MAZE_LOGGING__LEVEL".to_string(), self.logging.level.clone()),
            (
                "MAZE_LOGGING__FORMAT".to_string(),
                match self.logging.format {
                    LogFormat::Compact => "compact",
                    LogFormat::Json => "json",
                }
                .to_string(),
            ),
        ];
        if let Some(seed) = self.runner.seed {
            env.push((
                "MAZE_RUNNER__SEED".to_string(),
                seed.wrapping_add(slot as u64).to_string(),
            ));
        }
        if let Some(max_steps) = self.runner.max_steps {
            env.push(("MAZE_RUNNER__MAX_STEPS".to_string(), max_steps.to_string()));
        }
        env
    }
}
