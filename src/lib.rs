// src/lib.rs
//! Maze Runners Library
//!
//! Independent runner processes solve the same maze by random walk,
//! coordinating only through a named shared memory arena guarded by a
//! cross-process lock.
//!
//! # Architecture
//!
//! The crate is structured into several key modules:
//!
//! - **maze**: cell codes, the fixed-capacity grid, and the text loader
//! - **arena**: shared region lifecycle, cross-process lock, runner registry
//! - **runtime**: movement oracle, runner agent, placement, process
//!   management, and the controller
//! - **observability**: tracing setup and metric names
//! - **utils**: configuration and errors

pub mod arena;
pub mod exit_codes;
pub mod maze;
pub mod observability;
pub mod runtime;
pub mod utils;

// Re-export commonly used types
pub use arena::{ArenaLocation, SharedArena, MAX_RUNNERS};
pub use maze::{Cell, MazeGrid, Position};
pub use runtime::agent::{AgentConfig, AgentOutcome, RunnerAgent};
pub use runtime::controller::{Controller, RunReport};
pub use utils::config::SimulationConfig;
pub use utils::errors::{MazeError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
