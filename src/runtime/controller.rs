// src/runtime/controller.rs
//! Controller process orchestration
//!
//! Loads the maze, creates and initializes the arena, spawns one runner
//! process per placement slot, then waits until the runners are done or
//! the operator asks to stop. On the way out it raises the quit flag,
//! gives runners a grace period, kills stragglers and unlinks the arena.

use crate::arena::shared::{ArenaSnapshot, SharedArena};
use crate::exit_codes;
use crate::maze::grid::Position;
use crate::maze::loader::load_maze;
use crate::observability::record_outcome;
use crate::runtime::placement::place_runners;
use crate::runtime::process_manager::{ProcessManager, SpawnConfig};
use crate::utils::config::SimulationConfig;
use crate::utils::errors::Result;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::BufRead;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// How often the controller logs registry progress
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Grace between SIGTERM and SIGKILL for stragglers
const KILL_GRACE: Duration = Duration::from_millis(500);

/// How one runner process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerExit {
    ReachedExit,
    Cancelled,
    StepLimit,
    Failed(Option<i32>),
}

impl RunnerExit {
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(exit_codes::REACHED_EXIT) => RunnerExit::ReachedExit,
            Some(exit_codes::CANCELLED) => RunnerExit::Cancelled,
            Some(exit_codes::STEP_LIMIT) => RunnerExit::StepLimit,
            other => RunnerExit::Failed(other),
        }
    }

    fn label(self) -> &'static str {
        match self {
            RunnerExit::ReachedExit => "reached_exit",
            RunnerExit::Cancelled => "cancelled",
            RunnerExit::StepLimit => "step_limit",
            RunnerExit::Failed(_) => "failed",
        }
    }
}

/// Why supervision stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    AllFinished,
    Operator,
    Interrupted,
}

/// Summary printed when the controller exits
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub maze: PathBuf,
    pub arena: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<StopReason>,
    pub requested: usize,
    pub spawned: usize,
    pub failed_to_start: usize,
    pub reached_exit: usize,
    pub cancelled: usize,
    pub step_limit: usize,
    pub failed: usize,
    pub killed: usize,
    pub joined: usize,
    pub final_positions: Vec<Position>,
}

impl RunReport {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            maze: config.simulation.maze_path.clone(),
            arena: config.arena.name.clone(),
            started_at: Utc::now(),
            finished_at: None,
            stop_reason: None,
            requested: config.simulation.runners,
            spawned: 0,
            failed_to_start: 0,
            reached_exit: 0,
            cancelled: 0,
            step_limit: 0,
            failed: 0,
            killed: 0,
            joined: 0,
            final_positions: Vec::new(),
        }
    }

    /// Count one finished runner
    pub fn record(&mut self, exit: RunnerExit) {
        match exit {
            RunnerExit::ReachedExit => self.reached_exit += 1,
            RunnerExit::Cancelled => self.cancelled += 1,
            RunnerExit::StepLimit => self.step_limit += 1,
            RunnerExit::Failed(_) => self.failed += 1,
        }
        record_outcome(exit.label());
    }

    /// Runners accounted for by any terminal outcome
    pub fn finished(&self) -> usize {
        self.reached_exit + self.cancelled + self.step_limit + self.failed + self.killed
    }

    /// True when every requested runner started and reached the exit
    pub fn all_reached_exit(&self) -> bool {
        self.failed_to_start == 0 && self.reached_exit == self.requested
    }

    fn apply_snapshot(&mut self, snapshot: ArenaSnapshot) {
        self.joined = snapshot.positions.len();
        self.final_positions = snapshot.positions;
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Maze: {} (arena '{}')", self.maze.display(), self.arena)?;
        writeln!(
            f,
            "Runners: {} requested, {} spawned, {} failed to start, {} joined",
            self.requested, self.spawned, self.failed_to_start, self.joined
        )?;
        write!(
            f,
            "Outcomes: {} reached exit, {} cancelled, {} hit step limit, {} failed, {} killed",
            self.reached_exit, self.cancelled, self.step_limit, self.failed, self.killed
        )
    }
}

enum OperatorInput {
    Enter,
    Closed,
}

/// Wait for ENTER on a detached thread.
///
/// A blocking stdin read cannot be cancelled, so it must not live on the
/// runtime: shutting the runtime down would wait for the read to finish.
fn watch_operator() -> oneshot::Receiver<OperatorInput> {
    let (tx, rx) = oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("operator-input".to_string())
        .spawn(move || {
            let mut line = String::new();
            let input = match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => OperatorInput::Closed,
                Ok(_) => OperatorInput::Enter,
            };
            let _ = tx.send(input);
        });
    if let Err(e) = spawned {
        warn!("Cannot watch stdin, running without an operator: {}", e);
    }
    rx
}

type RunnerResult = (usize, std::io::Result<ExitStatus>);

/// Drives a whole simulation run
pub struct Controller {
    config: SimulationConfig,
    processes: ProcessManager,
}

impl Controller {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            processes: ProcessManager::new(),
        }
    }

    /// Run the simulation to completion.
    ///
    /// With `wait_for_operator`, keeps running until ENTER (or Ctrl-C) even
    /// after every runner finished; a closed stdin counts as no operator.
    pub async fn run(mut self, wait_for_operator: bool) -> Result<RunReport> {
        let mut report = RunReport::new(&self.config);

        let grid = load_maze(&self.config.simulation.maze_path)?;
        let mut rng = match self.config.runner.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let placements = place_runners(&grid, self.config.simulation.runners, &mut rng)?;

        let location = self.config.arena_location();
        let arena = SharedArena::create(&location, &grid, &placements)?;

        let supervised = self.supervise(&arena, wait_for_operator, &mut report).await;

        match arena.snapshot() {
            Ok(snapshot) => report.apply_snapshot(snapshot),
            Err(e) => warn!("Failed to read final registry: {}", e),
        }
        if let Err(e) = arena.destroy() {
            error!("Failed to destroy arena: {}", e);
        }

        report.finished_at = Some(Utc::now());
        supervised?;
        Ok(report)
    }

    async fn supervise(
        &mut self,
        arena: &SharedArena,
        wait_for_operator: bool,
        report: &mut RunReport,
    ) -> Result<()> {
        let runners = self.config.simulation.runners;
        let mut running: JoinSet<RunnerResult> = JoinSet::new();
        let mut pids: HashMap<usize, u32> = HashMap::new();

        match self.processes.find_runner(self.config.runner.binary.as_deref()) {
            Ok(program) => {
                for slot in 0..runners {
                    let spawn = SpawnConfig {
                        program: program.clone(),
                        args: vec!["--slot".to_string(), slot.to_string()],
                        env_vars: self.config.runner_env(slot),
                    };
                    match self.processes.spawn(spawn) {
                        Ok(mut child) => {
                            if let Some(pid) = child.id() {
                                pids.insert(slot, pid);
                            }
                            report.spawned += 1;
                            running.spawn(async move { (slot, child.wait().await) });
                        }
                        Err(e) => {
                            warn!(slot, "Runner failed to start: {}", e);
                            report.failed_to_start += 1;
                        }
                    }
                }
            }
            Err(e) => {
                error!("Cannot start runners: {}", e);
                report.failed_to_start = runners;
            }
        }
        info!(spawned = report.spawned, failed = report.failed_to_start, "Runners launched");

        if wait_for_operator {
            eprintln!("Keep this running until you are done with the program.");
            eprintln!("Press ENTER to quit.");
        }

        let mut operator = if wait_for_operator {
            watch_operator()
        } else {
            oneshot::channel().1
        };
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);
        let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
        let mut operator_present = wait_for_operator;
        let none_signalled = HashSet::new();

        let reason = loop {
            if running.is_empty() && !operator_present {
                break StopReason::AllFinished;
            }

            tokio::select! {
                joined = running.join_next(), if !running.is_empty() => {
                    if let Some(joined) = joined {
                        Self::settle(joined, &mut pids, &none_signalled, report);
                    }
                    if running.is_empty() && operator_present {
                        info!("All runners finished; press ENTER to quit");
                    }
                }
                input = &mut operator, if operator_present => match input {
                    Ok(OperatorInput::Enter) => break StopReason::Operator,
                    Ok(OperatorInput::Closed) | Err(_) => operator_present = false,
                },
                _ = &mut interrupt => break StopReason::Interrupted,
                _ = progress.tick() => {
                    if let Ok(snapshot) = arena.snapshot() {
                        info!(
                            joined = snapshot.positions.len(),
                            finished = report.finished(),
                            "Progress"
                        );
                    }
                }
            }
        };
        report.stop_reason = Some(reason);
        info!(?reason, "Stopping simulation");

        arena.request_quit()?;
        self.drain(&mut running, &mut pids, report).await;
        Ok(())
    }

    /// Let runners notice the quit flag, then signal whoever is left
    async fn drain(
        &self,
        running: &mut JoinSet<RunnerResult>,
        pids: &mut HashMap<usize, u32>,
        report: &mut RunReport,
    ) {
        let mut signalled = HashSet::new();
        if Self::wait_for(running, pids, &signalled, report, self.config.shutdown_grace()).await {
            return;
        }

        for (slot, pid) in pids.iter() {
            warn!(slot, pid, "Runner ignored quit flag, terminating");
            match self.processes.terminate(*pid) {
                Ok(true) => {
                    signalled.insert(*slot);
                }
                Ok(false) => debug!(slot, pid, "Runner already exited"),
                Err(e) => warn!(slot, pid, "Terminate failed: {}", e),
            }
        }
        if Self::wait_for(running, pids, &signalled, report, KILL_GRACE).await {
            return;
        }

        for (slot, pid) in pids.iter() {
            warn!(slot, pid, "Runner survived SIGTERM, killing");
            match self.processes.force_kill(*pid) {
                Ok(true) => {
                    signalled.insert(*slot);
                }
                Ok(false) => debug!(slot, pid, "Runner already exited"),
                Err(e) => warn!(slot, pid, "Kill failed: {}", e),
            }
        }
        while let Some(joined) = running.join_next().await {
            Self::settle(joined, pids, &signalled, report);
        }
    }

    /// Settle runners as they exit; true once none are left
    async fn wait_for(
        running: &mut JoinSet<RunnerResult>,
        pids: &mut HashMap<usize, u32>,
        signalled: &HashSet<usize>,
        report: &mut RunReport,
        timeout: Duration,
    ) -> bool {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        while !running.is_empty() {
            tokio::select! {
                joined = running.join_next() => {
                    if let Some(joined) = joined {
                        Self::settle(joined, pids, signalled, report);
                    }
                }
                _ = &mut deadline => return false,
            }
        }
        true
    }

    /// Record how one runner ended.
    ///
    /// A runner counts as killed only if we signalled it and a signal is what
    /// ended it; one that exited on its own keeps its real outcome.
    fn settle(
        joined: std::result::Result<RunnerResult, JoinError>,
        pids: &mut HashMap<usize, u32>,
        signalled: &HashSet<usize>,
        report: &mut RunReport,
    ) {
        match joined {
            Ok((slot, status)) => {
                pids.remove(&slot);
                let exit = match status {
                    Ok(status) if signalled.contains(&slot) && status.signal().is_some() => {
                        info!(slot, signal = status.signal(), "Runner killed");
                        report.killed += 1;
                        record_outcome("killed");
                        return;
                    }
                    Ok(status) => RunnerExit::from_status(status),
                    Err(e) => {
                        warn!(slot, "Failed to wait for runner: {}", e);
                        RunnerExit::Failed(None)
                    }
                };
                match exit {
                    RunnerExit::Failed(code) => warn!(slot, ?code, "Runner failed"),
                    _ => info!(slot, outcome = exit.label(), "Runner exited"),
                }
                report.record(exit);
            }
            Err(e) => {
                error!("Runner wait task failed: {}", e);
                report.record(RunnerExit::Failed(None));
            }
        }
    }
}
