// src/arena/mod.rs
//! Shared memory arena
//!
//! - **Layout**: `#[repr(C)]` view of the region (magic, grid, registry, quit)
//! - **Shared**: create / attach / destroy lifecycle and typed accessors
//! - **Lock**: cross-process mutual exclusion (`flock`)
//! - **Registry**: join, publish and atomic claim over runner positions

pub mod layout;
pub mod lock;
pub mod registry;
pub mod shared;

pub use layout::{ARENA_MAGIC, ARENA_SIZE, MAX_RUNNERS};
pub use lock::{ArenaLock, LockGuard};
pub use registry::{Claim, Membership, Registry};
pub use shared::{ArenaLocation, ArenaSnapshot, SharedArena};
