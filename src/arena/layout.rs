// src/arena/layout.rs
//! Binary layout of the shared arena
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┬─────────────────────────────┬──────┐
//! │ magic (u64)  │ grid: cols, rows, cells[c][r]│ registry: capacity, count,  │ quit │
//! │              │                              │ positions[], placements[]   │      │
//! └──────────────┴──────────────────────────────┴─────────────────────────────┴──────┘
//! ```
//!
//! Every field is valid when zero-filled, so a freshly truncated region can
//! be viewed through this layout before it is initialized.

use crate::maze::grid::{Position, MAX_MAZE_COLS, MAX_MAZE_ROWS};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

/// Fixed capacity of the runner registry
pub const MAX_RUNNERS: usize = 50;

/// Written last during initialization ("MAZERUNR")
pub const ARENA_MAGIC: u64 = 0x4D41_5A45_5255_4E52;

/// Size in bytes of the shared region
pub const ARENA_SIZE: usize = std::mem::size_of::<ArenaLayout>();

#[repr(C)]
pub struct ArenaLayout {
    pub magic: AtomicU64,
    pub grid: GridBlock,
    pub registry: RegistryBlock,
    pub quit: AtomicU32,
}

/// Maze cells, immutable once the magic number is published
#[repr(C)]
pub struct GridBlock {
    pub cols: u32,
    pub rows: u32,
    pub cells: [[u8; MAX_MAZE_ROWS]; MAX_MAZE_COLS],
}

#[repr(C)]
pub struct RegistryBlock {
    /// Populated placement slots for this run
    pub capacity: AtomicU32,
    /// Runners joined so far
    pub count: AtomicU32,
    pub positions: [SlotBlock; MAX_RUNNERS],
    pub placements: [SlotBlock; MAX_RUNNERS],
}

#[repr(C)]
pub struct SlotBlock {
    pub col: AtomicI32,
    pub row: AtomicI32,
}

// Registry fields are only touched while the arena lock is held; the lock
// orders the accesses, so relaxed loads and stores are enough.
impl SlotBlock {
    pub fn load(&self) -> Position {
        Position::new(
            self.col.load(Ordering::Relaxed),
            self.row.load(Ordering::Relaxed),
        )
    }

    pub fn store(&self, pos: Position) {
        self.col.store(pos.col, Ordering::Relaxed);
        self.row.store(pos.row, Ordering::Relaxed);
    }
}
