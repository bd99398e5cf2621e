// src/maze/mod.rs
//! Maze representation
//!
//! - **Cell**: wall / empty / exit codes and their text markers
//! - **Grid**: fixed-capacity grid addressed by (column, row)
//! - **Loader**: plain-text maze files

pub mod cell;
pub mod grid;
pub mod loader;

pub use cell::Cell;
pub use grid::{MazeGrid, Position, MAX_MAZE_COLS, MAX_MAZE_ROWS};
pub use loader::{load_maze, parse_maze};
