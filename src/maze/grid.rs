// src/maze/grid.rs
//! Fixed-capacity maze grid addressed by (column, row)

use crate::maze::cell::Cell;
use crate::utils::errors::{MazeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest maze the shared arena can hold
pub const MAX_MAZE_COLS: usize = 128;

/// Tallest maze the shared arena can hold
pub const MAX_MAZE_ROWS: usize = 128;

/// A (column, row) coordinate.
///
/// Signed so that a step off the left or top edge produces a coordinate the
/// grid can reject instead of wrapping around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub col: i32,
    pub row: i32,
}

impl Position {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The coordinate shifted by the given column and row deltas
    pub fn offset(self, dcol: i32, drow: i32) -> Self {
        Self {
            col: self.col.saturating_add(dcol),
            row: self.row.saturating_add(drow),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Maze grid with dimensions fixed at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MazeGrid {
    cols: usize,
    rows: usize,
    /// Column-major: cell (c, r) lives at `c * rows + r`
    cells: Vec<Cell>,
}

impl MazeGrid {
    /// Create a grid filled with one cell code
    pub fn new(cols: usize, rows: usize, fill: Cell) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(MazeError::MazeLoad(format!(
                "degenerate maze dimensions {}x{}",
                cols, rows
            )));
        }
        if cols > MAX_MAZE_COLS || rows > MAX_MAZE_ROWS {
            return Err(MazeError::MazeLoad(format!(
                "maze {}x{} exceeds capacity {}x{}",
                cols, rows, MAX_MAZE_COLS, MAX_MAZE_ROWS
            )));
        }

        Ok(Self {
            cols,
            rows,
            cells: vec![fill; cols * rows],
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Whether the coordinate lies inside the loaded dimensions
    pub fn contains(&self, pos: Position) -> bool {
        self.index_of(pos).is_some()
    }

    fn index_of(&self, pos: Position) -> Option<usize> {
        let col = usize::try_from(pos.col).ok()?;
        let row = usize::try_from(pos.row).ok()?;
        (col < self.cols && row < self.rows).then(|| col * self.rows + row)
    }

    fn out_of_bounds(&self, pos: Position) -> MazeError {
        MazeError::OutOfBounds {
            col: pos.col,
            row: pos.row,
            cols: self.cols,
            rows: self.rows,
        }
    }

    /// Read a cell, rejecting coordinates outside the maze
    pub fn cell(&self, pos: Position) -> Result<Cell> {
        self.index_of(pos)
            .map(|idx| self.cells[idx])
            .ok_or_else(|| self.out_of_bounds(pos))
    }

    pub fn set(&mut self, pos: Position, cell: Cell) -> Result<()> {
        let idx = self.index_of(pos).ok_or_else(|| self.out_of_bounds(pos))?;
        self.cells[idx] = cell;
        Ok(())
    }

    /// All coordinates holding the given cell code, column by column
    pub fn positions_of(&self, cell: Cell) -> Vec<Position> {
        let mut found = Vec::new();
        for col in 0..self.cols {
            for row in 0..self.rows {
                if self.cells[col * self.rows + row] == cell {
                    found.push(Position::new(col as i32, row as i32));
                }
            }
        }
        found
    }

    pub fn empty_cells(&self) -> Vec<Position> {
        self.positions_of(Cell::Empty)
    }

    pub fn exits(&self) -> Vec<Position> {
        self.positions_of(Cell::Exit)
    }
}

impl fmt::Display for MazeGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                write!(f, "{}", self.cells[col * self.rows + row].as_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
