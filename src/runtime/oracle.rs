// src/runtime/oracle.rs
//! Movement and occupancy decisions
//!
//! The oracle owns the runner's private copy of the maze. Exit and wall
//! checks never touch the arena; occupancy needs a registry snapshot, which
//! the live variants take under the arena lock.

use crate::arena::registry::Registry;
use crate::maze::cell::Cell;
use crate::maze::grid::{MazeGrid, Position};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct Oracle {
    grid: MazeGrid,
}

impl Oracle {
    pub fn new(grid: MazeGrid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &MazeGrid {
        &self.grid
    }

    /// Whether `pos` is an exit cell
    pub fn is_exit(&self, pos: Position) -> Result<bool> {
        Ok(self.grid.cell(pos)? == Cell::Exit)
    }

    /// Whether any runner other than `me` sits on `pos`
    pub fn occupied_by_other(me: usize, pos: Position, positions: &[Position]) -> bool {
        positions
            .iter()
            .enumerate()
            .any(|(index, other)| index != me && *other == pos)
    }

    /// Movability against a registry snapshot.
    ///
    /// An exit is always enterable, whoever already stands on it.
    pub fn is_movable_among(&self, me: usize, pos: Position, positions: &[Position]) -> Result<bool> {
        let cell = self.grid.cell(pos)?;
        Ok(cell == Cell::Exit || (cell.is_passable() && !Self::occupied_by_other(me, pos, positions)))
    }

    /// Occupancy against the live registry
    pub fn is_occupied(&self, registry: &Registry<'_>, me: usize, pos: Position) -> Result<bool> {
        self.grid.cell(pos)?;
        registry.is_occupied(me, pos)
    }

    /// Movability against the live registry.
    ///
    /// The answer may be stale by the time the caller acts on it; use
    /// [`Registry::claim`] to check and move atomically.
    pub fn is_movable(&self, registry: &Registry<'_>, me: usize, pos: Position) -> Result<bool> {
        match self.grid.cell(pos)? {
            Cell::Exit => Ok(true),
            Cell::Wall => Ok(false),
            Cell::Empty => Ok(!registry.is_occupied(me, pos)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::loader::parse_maze;
    use proptest::prelude::*;

    fn oracle() -> Oracle {
        Oracle::new(parse_maze("XXXX\nX  E\nXXXX").unwrap())
    }

    #[test]
    fn test_exit_detection() {
        let oracle = oracle();
        assert!(oracle.is_exit(Position::new(3, 1)).unwrap());
        assert!(!oracle.is_exit(Position::new(1, 1)).unwrap());
        assert!(!oracle.is_exit(Position::new(0, 0)).unwrap());
        assert!(oracle.is_exit(Position::new(4, 1)).unwrap_err().is_out_of_bounds());
    }

    #[test]
    fn test_walls_are_not_movable() {
        let oracle = oracle();
        assert!(!oracle.is_movable_among(0, Position::new(0, 1), &[]).unwrap());
        assert!(oracle.is_movable_among(0, Position::new(2, 1), &[]).unwrap());
    }

    #[test]
    fn test_occupancy_ignores_own_record() {
        let positions = [Position::new(1, 1), Position::new(2, 1)];
        assert!(!Oracle::occupied_by_other(0, Position::new(1, 1), &positions));
        assert!(Oracle::occupied_by_other(1, Position::new(1, 1), &positions));
        assert!(!Oracle::occupied_by_other(0, Position::new(3, 1), &positions));
    }

    #[test]
    fn test_occupied_cell_is_not_movable() {
        let oracle = oracle();
        let positions = [Position::new(1, 1), Position::new(2, 1)];
        assert!(!oracle.is_movable_among(0, Position::new(2, 1), &positions).unwrap());
        assert!(oracle.is_movable_among(1, Position::new(2, 1), &positions).unwrap());
    }

    #[test]
    fn test_out_of_bounds_is_reported() {
        let oracle = oracle();
        for pos in [Position::new(-1, 1), Position::new(1, 3)] {
            let err = oracle.is_movable_among(0, pos, &[]).unwrap_err();
            assert!(err.is_out_of_bounds());
        }
    }

    proptest! {
        #[test]
        fn prop_exit_always_movable(
            others in prop::collection::vec((0i32..4, 0i32..3), 0..10),
            me in 0usize..10,
        ) {
            let oracle = oracle();
            let exit = Position::new(3, 1);
            let mut positions: Vec<_> = others.into_iter().map(|(c, r)| Position::new(c, r)).collect();
            positions.push(exit);

            prop_assert!(oracle.is_exit(exit).unwrap());
            prop_assert!(oracle.is_movable_among(me, exit, &positions).unwrap());
        }
    }
}
