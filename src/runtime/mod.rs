// src/runtime/mod.rs
//! Runner and controller runtime
//!
//! - **Oracle**: wall / exit / occupancy decisions for a target cell
//! - **Dice**: five-faced direction rolls (four moves and `Stay`)
//! - **Agent**: the per-process runner state machine
//! - **Placement**: random, collision-free start cells
//! - **Process Manager**: spawning and killing runner processes
//! - **Controller**: arena lifecycle and runner supervision
//!
//! # Architecture
//!
//! ```text
//!  Controller ──create──► SharedArena ◄──attach── maze-runner (× N)
//!      │                  grid │ registry │ quit        │
//!      │                       ▲                        │
//!      └──spawn / kill──► ProcessManager     RunnerAgent ─► Oracle
//!                                               │
//!                                   join / claim / publish (locked)
//! ```

pub mod agent;
pub mod controller;
pub mod dice;
pub mod oracle;
pub mod placement;
pub mod process_manager;

// Re-export commonly used types
pub use agent::{AgentConfig, AgentOutcome, AgentState, RunnerAgent, StepReport};
pub use controller::{Controller, RunReport, RunnerExit, StopReason};
pub use dice::{Dice, RandomDice, Roll, ScriptedDice};
pub use oracle::Oracle;
pub use placement::place_runners;
pub use process_manager::{ProcessManager, SpawnConfig};
