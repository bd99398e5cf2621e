// src/utils/mod.rs
//! Configuration and error types

pub mod config;
pub mod errors;

pub use config::{LogFormat, LoggingConfig, SimulationConfig};
pub use errors::{MazeError, Result};
