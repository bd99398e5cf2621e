// src/maze/loader.rs
//! Maze text loader
//!
//! One line per row, one character per column. Zero-length lines are
//! skipped, the longest line sets the column count, and rows shorter than
//! that are padded with walls.

use crate::maze::cell::Cell;
use crate::maze::grid::{MazeGrid, Position};
use crate::utils::errors::{MazeError, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Load a maze from a text file
pub fn load_maze<P: AsRef<Path>>(path: P) -> Result<MazeGrid> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        MazeError::MazeLoad(format!("cannot read {}: {}", path.display(), e))
    })?;

    let grid = parse_maze(&text)?;
    info!(
        path = %path.display(),
        cols = grid.cols(),
        rows = grid.rows(),
        "Loaded maze"
    );
    Ok(grid)
}

/// Parse maze text into a grid
pub fn parse_maze(text: &str) -> Result<MazeGrid> {
    let lines: Vec<Vec<char>> = text
        .lines()
        .map(|line| line.chars().collect::<Vec<_>>())
        .filter(|chars| !chars.is_empty())
        .collect();

    let rows = lines.len();
    let cols = lines.iter().map(Vec::len).max().unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Err(MazeError::MazeLoad("maze is empty".to_string()));
    }

    let mut grid = MazeGrid::new(cols, rows, Cell::Wall)?;
    for (row, chars) in lines.iter().enumerate() {
        for (col, &c) in chars.iter().enumerate() {
            let cell = Cell::from_char(c).ok_or_else(|| {
                MazeError::MazeLoad(format!(
                    "unrecognized character {:?} at column {}, row {}",
                    c, col, row
                ))
            })?;
            grid.set(Position::new(col as i32, row as i32), cell)?;
        }
    }

    if grid.exits().is_empty() {
        return Err(MazeError::MazeLoad("maze has no exit".to_string()));
    }

    debug!(cols, rows, "Parsed maze text");
    Ok(grid)
}
