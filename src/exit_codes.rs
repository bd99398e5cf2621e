// src/exit_codes.rs
//! Stable exit codes for the `maze-runner` process.

/// The runner reached the exit.
pub const REACHED_EXIT: i32 = 0;
/// Arena, lock or configuration failure; the runner gave up.
pub const FAILED: i32 = 1;
/// The controller raised the quit flag before the runner got out.
pub const CANCELLED: i32 = 2;
/// The configured step limit ran out before the exit was found.
pub const STEP_LIMIT: i32 = 3;
