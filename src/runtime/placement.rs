// src/runtime/placement.rs
//! Initial runner placement table

use crate::arena::layout::MAX_RUNNERS;
use crate::maze::grid::{MazeGrid, Position};
use crate::utils::errors::{MazeError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Pick `runners` distinct empty cells at random
pub fn place_runners<R: Rng + ?Sized>(grid: &MazeGrid, runners: usize, rng: &mut R) -> Result<Vec<Position>> {
    if runners == 0 || runners > MAX_RUNNERS {
        return Err(MazeError::Placement(format!(
            "runner count must be 1..={}, got {}",
            MAX_RUNNERS, runners
        )));
    }

    let empty = grid.empty_cells();
    if empty.len() < runners {
        return Err(MazeError::Placement(format!(
            "maze has {} empty cells for {} runners",
            empty.len(),
            runners
        )));
    }

    let placements: Vec<Position> = empty.choose_multiple(rng, runners).copied().collect();
    debug!(runners, free = empty.len(), "Placed runners");
    Ok(placements)
}
