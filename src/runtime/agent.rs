// src/runtime/agent.rs
//! Runner agent state machine
//!
//! ```text
//! join() ──► Active ──step()──► Active
//!              │
//!              ├── on exit cell ──► AtExit     (success)
//!              ├── quit flag ─────► Cancelled
//!              └── step limit ────► Exhausted
//! ```
//!
//! Each step rolls a direction, resolves the move with one atomic claim
//! against the registry, then sleeps. The lock is never held across the
//! roll or the sleep.

use crate::arena::registry::{Claim, Membership};
use crate::arena::shared::SharedArena;
use crate::exit_codes;
use crate::maze::grid::Position;
use crate::observability::{METRIC_BLOCKED, METRIC_STEPS};
use crate::runtime::dice::{Dice, Roll};
use crate::runtime::oracle::Oracle;
use crate::utils::errors::Result;
use serde::Serialize;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Pacing and limits for one agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Sleep after every step
    pub step_interval: Duration,

    /// Give up after this many steps (unbounded when `None`)
    pub max_steps: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_millis(1000),
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Active,
    AtExit,
    Cancelled,
    Exhausted,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AgentOutcome {
    ReachedExit { index: usize, steps: u64 },
    Cancelled { index: usize, steps: u64 },
    StepLimit { index: usize, steps: u64 },
}

impl AgentOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            AgentOutcome::ReachedExit { .. } => exit_codes::REACHED_EXIT,
            AgentOutcome::Cancelled { .. } => exit_codes::CANCELLED,
            AgentOutcome::StepLimit { .. } => exit_codes::STEP_LIMIT,
        }
    }

    pub fn steps(&self) -> u64 {
        match self {
            AgentOutcome::ReachedExit { steps, .. }
            | AgentOutcome::Cancelled { steps, .. }
            | AgentOutcome::StepLimit { steps, .. } => *steps,
        }
    }
}

/// What a single step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub roll: Roll,
    pub position: Position,
    pub moved: bool,
}

/// One runner attached to an arena
pub struct RunnerAgent<'a, D: Dice> {
    arena: &'a SharedArena,
    oracle: Oracle,
    index: usize,
    location: Position,
    dice: D,
    config: AgentConfig,
    state: AgentState,
    steps: u64,
}

impl<'a, D: Dice> RunnerAgent<'a, D> {
    /// Cache the maze and take a registry slot
    pub fn join(arena: &'a SharedArena, dice: D, config: AgentConfig) -> Result<Self> {
        let oracle = Oracle::new(arena.maze()?);
        let Membership { index, start } = arena.registry().join()?;

        info!(runner = index, col = start.col, row = start.row, "Runner active");
        Ok(Self {
            arena,
            oracle,
            index,
            location: start,
            dice,
            config,
            state: AgentState::Active,
            steps: 0,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn location(&self) -> Position {
        self.location
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Roll, move if the target can be claimed, publish, sleep
    pub fn step(&mut self) -> Result<StepReport> {
        let roll = self.dice.roll();
        let registry = self.arena.registry();

        let (position, moved) = match roll.offset() {
            None => {
                registry.publish(self.index, self.location)?;
                (self.location, false)
            }
            Some((dcol, drow)) => {
                let target = self.location.offset(dcol, drow);
                if self.oracle.grid().contains(target) {
                    match registry.claim(&self.oracle, self.index, self.location, target)? {
                        Claim::Moved(pos) => (pos, true),
                        Claim::Blocked(pos) => (pos, false),
                    }
                } else {
                    // maze edge without a wall: treat as blocked
                    debug!(runner = self.index, %target, "Target outside maze");
                    registry.publish(self.index, self.location)?;
                    (self.location, false)
                }
            }
        };

        self.location = position;
        self.steps += 1;

        metrics::counter!(METRIC_STEPS).increment(1);
        if roll != Roll::Stay && !moved {
            metrics::counter!(METRIC_BLOCKED).increment(1);
        }
        debug!(
            runner = self.index,
            step = self.steps,
            ?roll,
            moved,
            col = position.col,
            row = position.row,
            "Step"
        );

        if !self.config.step_interval.is_zero() {
            thread::sleep(self.config.step_interval);
        }

        Ok(StepReport {
            roll,
            position,
            moved,
        })
    }

    /// Step until the exit, the quit flag, or the step limit
    pub fn run(&mut self) -> Result<AgentOutcome> {
        let outcome = loop {
            if self.oracle.is_exit(self.location)? {
                self.state = AgentState::AtExit;
                break AgentOutcome::ReachedExit {
                    index: self.index,
                    steps: self.steps,
                };
            }
            if self.arena.quit_requested()? {
                self.state = AgentState::Cancelled;
                break AgentOutcome::Cancelled {
                    index: self.index,
                    steps: self.steps,
                };
            }
            if self.config.max_steps.is_some_and(|max| self.steps >= max) {
                self.state = AgentState::Exhausted;
                break AgentOutcome::StepLimit {
                    index: self.index,
                    steps: self.steps,
                };
            }

            self.step()?;
        };

        info!(runner = self.index, steps = self.steps, ?outcome, "Runner finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::shared::ArenaLocation;
    use crate::maze::grid::MazeGrid;
    use crate::maze::loader::parse_maze;
    use crate::runtime::dice::{RandomDice, ScriptedDice};
    use tempfile::TempDir;

    fn fast() -> AgentConfig {
        AgentConfig {
            step_interval: Duration::ZERO,
            max_steps: Some(100_000),
        }
    }

    fn arena(dir: &TempDir, grid: &MazeGrid, placements: &[Position]) -> SharedArena {
        SharedArena::create(&ArenaLocation::new(dir.path(), "agent"), grid, placements).unwrap()
    }

    #[test]
    fn test_single_step_to_adjacent_exit() {
        let dir = tempfile::tempdir().unwrap();
        let grid = parse_maze("XXX\nX E\nXXX").unwrap();
        let arena = arena(&dir, &grid, &[Position::new(1, 1)]);

        let dice = ScriptedDice::new([Roll::East, Roll::East]);
        let mut agent = RunnerAgent::join(&arena, dice, fast()).unwrap();
        let outcome = agent.run().unwrap();

        assert_eq!(outcome, AgentOutcome::ReachedExit { index: 0, steps: 1 });
        assert_eq!(agent.state(), AgentState::AtExit);
        assert_eq!(agent.location(), Position::new(2, 1));
    }

    #[test]
    fn test_two_easts_reach_exit_in_two_steps() {
        let dir = tempfile::tempdir().unwrap();
        let grid = parse_maze("XXXX\nX  E\nXXXX").unwrap();
        let arena = arena(&dir, &grid, &[Position::new(1, 1)]);

        let dice = ScriptedDice::new([Roll::East, Roll::East]);
        let mut agent = RunnerAgent::join(&arena, dice, fast()).unwrap();

        assert_eq!(agent.run().unwrap(), AgentOutcome::ReachedExit { index: 0, steps: 2 });
        assert_eq!(arena.registry().positions().unwrap(), vec![Position::new(3, 1)]);
    }

    #[test]
    fn test_walls_and_stay_leave_position_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let grid = parse_maze("XXXX\nX  E\nXXXX").unwrap();
        let arena = arena(&dir, &grid, &[Position::new(1, 1)]);

        let dice = ScriptedDice::new([Roll::North, Roll::South, Roll::West, Roll::Stay]);
        let mut agent = RunnerAgent::join(&arena, dice, fast()).unwrap();

        for _ in 0..4 {
            let report = agent.step().unwrap();
            assert!(!report.moved);
            assert_eq!(report.position, Position::new(1, 1));
        }
        assert_eq!(agent.steps(), 4);
    }

    #[test]
    fn test_blocked_by_other_runner() {
        let dir = tempfile::tempdir().unwrap();
        let grid = parse_maze("XXXXX\nX   E\nXXXXX").unwrap();
        let arena = arena(&dir, &grid, &[Position::new(1, 1), Position::new(2, 1)]);

        let mut first = RunnerAgent::join(&arena, ScriptedDice::new([Roll::East]), fast()).unwrap();
        let mut second = RunnerAgent::join(&arena, ScriptedDice::new([Roll::West]), fast()).unwrap();

        assert!(!first.step().unwrap().moved);
        assert!(!second.step().unwrap().moved);
        assert_eq!(
            arena.registry().positions().unwrap(),
            vec![Position::new(1, 1), Position::new(2, 1)]
        );
    }

    #[test]
    fn test_open_edge_is_blocked_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let grid = parse_maze("  E").unwrap();
        let arena = arena(&dir, &grid, &[Position::new(0, 0)]);

        let dice = ScriptedDice::new([Roll::West, Roll::North, Roll::East, Roll::East]);
        let mut agent = RunnerAgent::join(&arena, dice, fast()).unwrap();
        assert_eq!(agent.run().unwrap(), AgentOutcome::ReachedExit { index: 0, steps: 4 });
    }

    #[test]
    fn test_quit_flag_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let grid = parse_maze("XXXX\nX  E\nXXXX").unwrap();
        let arena = arena(&dir, &grid, &[Position::new(1, 1)]);

        let mut agent = RunnerAgent::join(&arena, ScriptedDice::default(), fast()).unwrap();
        arena.request_quit().unwrap();

        let outcome = agent.run().unwrap();
        assert_eq!(outcome, AgentOutcome::Cancelled { index: 0, steps: 0 });
        assert_eq!(outcome.exit_code(), exit_codes::CANCELLED);
        assert_eq!(agent.state(), AgentState::Cancelled);
    }

    #[test]
    fn test_step_limit() {
        let dir = tempfile::tempdir().unwrap();
        let grid = parse_maze("XXXX\nX  E\nXXXX").unwrap();
        let arena = arena(&dir, &grid, &[Position::new(1, 1)]);

        let config = AgentConfig {
            step_interval: Duration::ZERO,
            max_steps: Some(5),
        };
        let mut agent = RunnerAgent::join(&arena, ScriptedDice::default(), config).unwrap();

        let outcome = agent.run().unwrap();
        assert_eq!(outcome, AgentOutcome::StepLimit { index: 0, steps: 5 });
        assert_eq!(outcome.exit_code(), exit_codes::STEP_LIMIT);
    }

    #[test]
    fn test_random_walk_finds_exit_in_corridor() {
        let grid = parse_maze("XXXXXXXXXX\nX        E\nXXXXXXXXXX").unwrap();

        for seed in 0..8 {
            let dir = tempfile::tempdir().unwrap();
            let arena = arena(&dir, &grid, &[Position::new(1, 1)]);
            let mut agent = RunnerAgent::join(&arena, RandomDice::new(Some(seed)), fast()).unwrap();

            let outcome = agent.run().unwrap();
            assert!(
                matches!(outcome, AgentOutcome::ReachedExit { .. }),
                "seed {} ended with {:?}",
                seed,
                outcome
            );
        }
    }

    #[test]
    fn test_full_registry_fails_join() {
        let dir = tempfile::tempdir().unwrap();
        let grid = parse_maze("XXXX\nX  E\nXXXX").unwrap();
        let arena = arena(&dir, &grid, &[Position::new(1, 1)]);

        let _first = RunnerAgent::join(&arena, ScriptedDice::default(), fast()).unwrap();
        let second = RunnerAgent::join(&arena, ScriptedDice::default(), fast());
        assert!(matches!(
            second,
            Err(crate::utils::errors::MazeError::RegistryFull { capacity: 1 })
        ));
    }
}
