// src/maze/cell.rs
//! Cell codes of the maze grid
//!
//! The text format and the arena both store a cell as its marker byte, so
//! a maze file maps onto the shared grid without translation.

use serde::{Deserialize, Serialize};

/// Marker for an impassable cell
pub const WALL_CHAR: char = 'X';

/// Marker for an open cell
pub const EMPTY_CHAR: char = ' ';

/// Marker for the exit cell
pub const EXIT_CHAR: char = 'E';

/// A single maze cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Wall,
    Empty,
    Exit,
}

impl Cell {
    /// Parse a maze-file marker
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            WALL_CHAR => Some(Cell::Wall),
            EMPTY_CHAR => Some(Cell::Empty),
            EXIT_CHAR => Some(Cell::Exit),
            _ => None,
        }
    }

    /// Marker used in maze files
    pub fn as_char(self) -> char {
        match self {
            Cell::Wall => WALL_CHAR,
            Cell::Empty => EMPTY_CHAR,
            Cell::Exit => EXIT_CHAR,
        }
    }

    /// Byte stored in the shared grid
    pub fn to_byte(self) -> u8 {
        self.as_char() as u8
    }

    /// Decode a byte from the shared grid.
    ///
    /// Anything unrecognized (including the zero fill of a fresh region)
    /// decodes as a wall.
    pub fn from_byte(byte: u8) -> Self {
        Cell::from_char(byte as char).unwrap_or(Cell::Wall)
    }

    pub fn is_passable(self) -> bool {
        self != Cell::Wall
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_mapping() {
        assert_eq!(Cell::from_char('X'), Some(Cell::Wall));
        assert_eq!(Cell::from_char(' '), Some(Cell::Empty));
        assert_eq!(Cell::from_char('E'), Some(Cell::Exit));
        assert_eq!(Cell::from_char('#'), None);
    }

    #[test]
    fn test_byte_codes() {
        for cell in [Cell::Wall, Cell::Empty, Cell::Exit] {
            assert_eq!(Cell::from_byte(cell.to_byte()), cell);
        }
        assert_eq!(Cell::from_byte(0), Cell::Wall);
    }

    #[test]
    fn test_passable() {
        assert!(!Cell::Wall.is_passable());
        assert!(Cell::Empty.is_passable());
        assert!(Cell::Exit.is_passable());
    }
}
