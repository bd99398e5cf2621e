// src/utils/errors.rs
//! Error taxonomy shared by the controller and runner processes.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, MazeError>;

/// Errors raised by the arena, registry, agents and controller
#[derive(Debug, Error)]
pub enum MazeError {
    /// The named region already exists or could not be allocated
    #[error("failed to create arena '{name}': {reason}")]
    ArenaCreate { name: String, reason: String },

    /// No region with this name has been created yet
    #[error("arena '{name}' not found")]
    ArenaNotFound { name: String },

    /// The region exists but was never fully initialized
    #[error("arena '{name}' is not initialized: {reason}")]
    ArenaUninitialized { name: String, reason: String },

    /// The cross-process lock could not be opened or taken
    #[error("arena lock failed: {0}")]
    Lock(String),

    /// Every placement slot has already been claimed
    #[error("runner registry is full (capacity {capacity})")]
    RegistryFull { capacity: usize },

    /// A coordinate outside the loaded maze dimensions
    #[error("cell ({col}, {row}) is outside the {cols}x{rows} maze")]
    OutOfBounds {
        col: i32,
        row: i32,
        cols: usize,
        rows: usize,
    },

    #[error("failed to load maze: {0}")]
    MazeLoad(String),

    /// Not enough free cells for the requested runners
    #[error("failed to place runners: {0}")]
    Placement(String),

    #[error("failed to spawn process: {0}")]
    ProcessSpawnFailed(String),

    #[error("runtime error: {0}")]
    RuntimeError(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MazeError {
    /// Whether this error is an out-of-range coordinate
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, MazeError::OutOfBounds { .. })
    }
}

impl From<config::ConfigError> for MazeError {
    fn from(err: config::ConfigError) -> Self {
        MazeError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_message() {
        let err = MazeError::OutOfBounds {
            col: -1,
            row: 2,
            cols: 3,
            rows: 3,
        };
        assert!(err.is_out_of_bounds());
        assert_eq!(err.to_string(), "cell (-1, 2) is outside the 3x3 maze");
    }

    #[test]
    fn test_registry_full_message() {
        let err = MazeError::RegistryFull { capacity: 4 };
        assert!(!err.is_out_of_bounds());
        assert!(err.to_string().contains("capacity 4"));
    }
}
