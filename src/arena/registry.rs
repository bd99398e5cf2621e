// src/arena/registry.rs
//! Runner registry living inside the shared arena
//!
//! Every read or write of the registry happens inside one arena lock
//! acquisition. A join hands out the pre-increment count as the runner's
//! permanent index, so indices are always exactly `0..count`.

use crate::arena::layout::MAX_RUNNERS;
use crate::arena::shared::SharedArena;
use crate::maze::grid::Position;
use crate::observability::METRIC_JOINS;
use crate::runtime::oracle::Oracle;
use crate::utils::errors::{MazeError, Result};
use std::sync::atomic::Ordering;
use tracing::{debug, info};

/// Result of a join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub index: usize,
    pub start: Position,
}

/// Result of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The target was free and is now this runner's position
    Moved(Position),
    /// The target was a wall or occupied; the old position was republished
    Blocked(Position),
}

impl Claim {
    pub fn position(self) -> Position {
        match self {
            Claim::Moved(pos) | Claim::Blocked(pos) => pos,
        }
    }
}

/// Typed view over the registry block of an arena
#[derive(Clone, Copy)]
pub struct Registry<'a> {
    arena: &'a SharedArena,
}

impl<'a> Registry<'a> {
    pub(crate) fn new(arena: &'a SharedArena) -> Self {
        Self { arena }
    }

    /// Take the next index and its start position from the placement table
    pub fn join(&self) -> Result<Membership> {
        let _guard = self.arena.lock()?;
        let block = &self.arena.layout().registry;

        let count = block.count.load(Ordering::Relaxed) as usize;
        let capacity = self.capacity_unlocked();
        if count >= capacity {
            return Err(MazeError::RegistryFull { capacity });
        }

        let start = block.placements[count].load();
        block.positions[count].store(start);
        block.count.store(count as u32 + 1, Ordering::Relaxed);

        metrics::counter!(METRIC_JOINS).increment(1);
        info!(runner = count, col = start.col, row = start.row, "Runner joined registry");
        Ok(Membership {
            index: count,
            start,
        })
    }

    /// Overwrite this runner's record
    pub fn publish(&self, index: usize, pos: Position) -> Result<()> {
        let _guard = self.arena.lock()?;
        self.check_member(index)?;
        self.arena.layout().registry.positions[index].store(pos);
        Ok(())
    }

    /// Positions of every joined runner, in index order
    pub fn positions(&self) -> Result<Vec<Position>> {
        let _guard = self.arena.lock()?;
        Ok(self.positions_unlocked())
    }

    pub fn count(&self) -> Result<usize> {
        let _guard = self.arena.lock()?;
        Ok(self.count_unlocked())
    }

    /// Number of runners this arena was initialized for
    pub fn capacity(&self) -> Result<usize> {
        let _guard = self.arena.lock()?;
        Ok(self.capacity_unlocked())
    }

    /// Whether a runner other than `me` currently sits on `pos`
    pub fn is_occupied(&self, me: usize, pos: Position) -> Result<bool> {
        let _guard = self.arena.lock()?;
        Ok(Oracle::occupied_by_other(me, pos, &self.positions_unlocked()))
    }

    /// Check movability and publish the outcome in a single critical section.
    ///
    /// Two runners can never both claim the same free cell; the exit is the
    /// one cell any number of runners may share.
    pub fn claim(&self, oracle: &Oracle, me: usize, from: Position, target: Position) -> Result<Claim> {
        let _guard = self.arena.lock()?;
        self.check_member(me)?;

        let positions = self.positions_unlocked();
        let claim = if oracle.is_movable_among(me, target, &positions)? {
            Claim::Moved(target)
        } else {
            Claim::Blocked(from)
        };

        self.arena.layout().registry.positions[me].store(claim.position());
        debug!(runner = me, ?claim, "Claim resolved");
        Ok(claim)
    }

    fn check_member(&self, index: usize) -> Result<()> {
        let count = self.count_unlocked();
        if index >= count {
            return Err(MazeError::RuntimeError(format!(
                "runner {} has not joined (count {})",
                index, count
            )));
        }
        Ok(())
    }

    pub(crate) fn count_unlocked(&self) -> usize {
        let count = self.arena.layout().registry.count.load(Ordering::Relaxed) as usize;
        count.min(MAX_RUNNERS)
    }

    pub(crate) fn capacity_unlocked(&self) -> usize {
        let capacity = self.arena.layout().registry.capacity.load(Ordering::Relaxed) as usize;
        capacity.min(MAX_RUNNERS)
    }

    pub(crate) fn positions_unlocked(&self) -> Vec<Position> {
        self.arena.layout().registry.positions[..self.count_unlocked()]
            .iter()
            .map(|slot| slot.load())
            .collect()
    }
}
