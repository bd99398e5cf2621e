// src/arena/shared.rs
//! Named shared memory arena
//!
//! The arena is a file-backed `MAP_SHARED` mapping. The controller creates
//! and initializes it once, every runner attaches to it by name, and the
//! controller destroys it after the runners have been told to stop.
//!
//! ```text
//! controller: create ─► write grid, placements, quit=false ─► magic (locked)
//! runner:     attach ─► check magic ─► cache grid ─► registry ops (locked)
//! controller: request_quit ─► ... ─► destroy (unlink region + lock)
//! ```

use crate::arena::layout::{ArenaLayout, ARENA_MAGIC, ARENA_SIZE, MAX_RUNNERS};
use crate::arena::lock::{ArenaLock, LockGuard};
use crate::arena::registry::Registry;
use crate::maze::cell::Cell;
use crate::maze::grid::{MazeGrid, Position};
use crate::utils::errors::{MazeError, Result};
use memmap2::{MmapMut, MmapOptions};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

/// Where a named arena and its lock live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaLocation {
    pub dir: PathBuf,
    pub name: String,
}

impl ArenaLocation {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, name: S) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn region_path(&self) -> PathBuf {
        self.dir.join(format!("{}.arena", self.name))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(format!("{}.lock", self.name))
    }
}

/// Consistent copy of the mutable arena state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArenaSnapshot {
    pub capacity: usize,
    pub positions: Vec<Position>,
    pub quit: bool,
}

/// Handle to an attached arena
pub struct SharedArena {
    location: ArenaLocation,
    mmap: MmapMut,
    lock: ArenaLock,
}

impl SharedArena {
    /// Create and fully initialize a new arena.
    ///
    /// Fails with `ArenaCreate` if a region of that name already exists.
    /// The magic number is published last, under the lock.
    pub fn create(location: &ArenaLocation, grid: &MazeGrid, placements: &[Position]) -> Result<Self> {
        let create_err = |reason: String| MazeError::ArenaCreate {
            name: location.name.clone(),
            reason,
        };

        if placements.is_empty() || placements.len() > MAX_RUNNERS {
            return Err(create_err(format!(
                "placement table must hold 1..={} runners, got {}",
                MAX_RUNNERS,
                placements.len()
            )));
        }
        if let Some(bad) = placements.iter().find(|p| grid.cell(**p).ok() != Some(Cell::Empty)) {
            return Err(create_err(format!("placement {} is not an empty cell", bad)));
        }

        let path = location.region_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => create_err(format!("{} already exists", path.display())),
                _ => create_err(format!("cannot create {}: {}", path.display(), e)),
            })?;

        // a half-built region would block every later create
        let arena = match Self::initialize(location, file, grid, placements) {
            Ok(arena) => arena,
            Err(e) => {
                if let Err(unlink) = fs::remove_file(&path) {
                    warn!(name = %location.name, "Failed to remove partial region: {}", unlink);
                }
                return Err(e);
            }
        };

        info!(
            name = %location.name,
            path = %path.display(),
            bytes = ARENA_SIZE,
            runners = placements.len(),
            "Created shared arena"
        );
        Ok(arena)
    }

    /// Size, map and fill a freshly created region, publishing the magic last
    fn initialize(
        location: &ArenaLocation,
        file: File,
        grid: &MazeGrid,
        placements: &[Position],
    ) -> Result<Self> {
        let create_err = |reason: String| MazeError::ArenaCreate {
            name: location.name.clone(),
            reason,
        };

        file.set_len(ARENA_SIZE as u64)
            .map_err(|e| create_err(format!("cannot size region: {}", e)))?;

        let mut mmap = unsafe {
            MmapOptions::new()
                .len(ARENA_SIZE)
                .map_mut(&file)
                .map_err(|e| create_err(format!("cannot map region: {}", e)))?
        };

        // SAFETY: the mapping is page aligned, ARENA_SIZE bytes long, and
        // zero-filled, which is a valid `ArenaLayout`. Nobody can pass the
        // magic check until we publish it below, so this exclusive borrow
        // does not race with attached readers.
        let layout = unsafe { &mut *(mmap.as_mut_ptr() as *mut ArenaLayout) };

        layout.grid.cols = grid.cols() as u32;
        layout.grid.rows = grid.rows() as u32;
        for col in 0..grid.cols() {
            for row in 0..grid.rows() {
                let cell = grid.cell(Position::new(col as i32, row as i32))?;
                layout.grid.cells[col][row] = cell.to_byte();
            }
        }

        for (slot, pos) in layout.registry.placements.iter().zip(placements) {
            slot.store(*pos);
        }
        layout
            .registry
            .capacity
            .store(placements.len() as u32, Ordering::Relaxed);
        layout.registry.count.store(0, Ordering::Relaxed);
        layout.quit.store(0, Ordering::Relaxed);

        let lock = ArenaLock::open(location.lock_path())?;
        let arena = Self {
            location: location.clone(),
            mmap,
            lock,
        };

        {
            let _guard = arena.lock()?;
            arena.layout().magic.store(ARENA_MAGIC, Ordering::Release);
        }
        Ok(arena)
    }

    /// Attach to an arena created by the controller
    pub fn attach(location: &ArenaLocation) -> Result<Self> {
        let path = location.region_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => MazeError::ArenaNotFound {
                    name: location.name.clone(),
                },
                _ => MazeError::RuntimeError(format!("cannot open {}: {}", path.display(), e)),
            })?;

        let uninitialized = |reason: String| MazeError::ArenaUninitialized {
            name: location.name.clone(),
            reason,
        };

        let len = file
            .metadata()
            .map_err(|e| MazeError::RuntimeError(format!("cannot stat {}: {}", path.display(), e)))?
            .len();
        if len < ARENA_SIZE as u64 {
            return Err(uninitialized(format!(
                "region is {} bytes, expected {}",
                len, ARENA_SIZE
            )));
        }

        let mmap = unsafe {
            MmapOptions::new()
                .len(ARENA_SIZE)
                .map_mut(&file)
                .map_err(|e| MazeError::RuntimeError(format!("cannot map region: {}", e)))?
        };

        let lock = ArenaLock::open(location.lock_path())?;
        let arena = Self {
            location: location.clone(),
            mmap,
            lock,
        };

        let magic = arena.layout().magic.load(Ordering::Acquire);
        if magic != ARENA_MAGIC {
            return Err(uninitialized(format!("bad magic number {:#x}", magic)));
        }

        debug!(name = %location.name, "Attached to shared arena");
        Ok(arena)
    }

    /// Unlink the region and its lock file.
    ///
    /// Processes still attached keep their mapping; no new process can attach.
    pub fn destroy(self) -> Result<()> {
        let location = self.location.clone();
        drop(self);
        Self::destroy_location(&location)
    }

    /// Unlink a named arena without attaching to it (e.g. a leftover from a crash)
    pub fn destroy_location(location: &ArenaLocation) -> Result<()> {
        let region = location.region_path();
        match fs::remove_file(&region) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MazeError::ArenaNotFound {
                    name: location.name.clone(),
                })
            }
            Err(e) => {
                return Err(MazeError::RuntimeError(format!(
                    "cannot unlink {}: {}",
                    region.display(),
                    e
                )))
            }
        }

        if let Err(e) = fs::remove_file(location.lock_path()) {
            if e.kind() != ErrorKind::NotFound {
                warn!(name = %location.name, "Failed to remove lock file: {}", e);
            }
        }

        info!(name = %location.name, "Destroyed shared arena");
        Ok(())
    }

    pub(crate) fn layout(&self) -> &ArenaLayout {
        // SAFETY: the mapping is at least ARENA_SIZE bytes and page aligned.
        // After creation the grid is never written again and every other
        // field is atomic, so shared references are sound across processes.
        unsafe { &*(self.mmap.as_ptr() as *const ArenaLayout) }
    }

    pub(crate) fn lock(&self) -> Result<LockGuard<'_>> {
        self.lock.acquire()
    }

    pub fn location(&self) -> &ArenaLocation {
        &self.location
    }

    pub fn region_path(&self) -> PathBuf {
        self.location.region_path()
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// Private copy of the maze; the grid never changes after creation
    pub fn maze(&self) -> Result<MazeGrid> {
        let block = &self.layout().grid;
        let (cols, rows) = (block.cols as usize, block.rows as usize);
        let mut grid = MazeGrid::new(cols, rows, Cell::Wall)?;
        for col in 0..cols {
            for row in 0..rows {
                grid.set(
                    Position::new(col as i32, row as i32),
                    Cell::from_byte(block.cells[col][row]),
                )?;
            }
        }
        Ok(grid)
    }

    /// Runner registry view
    pub fn registry(&self) -> Registry<'_> {
        Registry::new(self)
    }

    /// Tell every runner to stop at its next step
    pub fn request_quit(&self) -> Result<()> {
        let _guard = self.lock()?;
        self.layout().quit.store(1, Ordering::Relaxed);
        info!(name = %self.location.name, "Quit requested");
        Ok(())
    }

    pub fn quit_requested(&self) -> Result<bool> {
        let _guard = self.lock()?;
        Ok(self.layout().quit.load(Ordering::Relaxed) != 0)
    }

    /// Registry contents and quit flag, read in one critical section
    pub fn snapshot(&self) -> Result<ArenaSnapshot> {
        let _guard = self.lock()?;
        let layout = self.layout();
        let registry = self.registry();
        Ok(ArenaSnapshot {
            capacity: registry.capacity_unlocked(),
            positions: registry.positions_unlocked(),
            quit: layout.quit.load(Ordering::Relaxed) != 0,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::maze::loader::parse_maze;
    use tempfile::TempDir;

    pub(crate) fn corridor() -> MazeGrid {
        parse_maze("XXXXXXX\nX     E\nXXXXXXX\n").unwrap()
    }

    pub(crate) fn location(dir: &TempDir) -> ArenaLocation {
        ArenaLocation::new(dir.path(), "test-arena")
    }

    #[test]
    fn test_create_attach_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(&dir);
        let grid = corridor();
        let placements = [Position::new(1, 1), Position::new(2, 1)];

        let arena = SharedArena::create(&loc, &grid, &placements).unwrap();
        assert!(loc.region_path().exists());

        let runner = SharedArena::attach(&loc).unwrap();
        assert_eq!(runner.maze().unwrap(), grid);
        assert!(!runner.quit_requested().unwrap());

        drop(runner);
        arena.destroy().unwrap();
        assert!(!loc.region_path().exists());
        assert!(!loc.lock_path().exists());
        assert!(matches!(
            SharedArena::attach(&loc),
            Err(MazeError::ArenaNotFound { .. })
        ));
    }

    #[test]
    fn test_create_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(&dir);
        let _arena = SharedArena::create(&loc, &corridor(), &[Position::new(1, 1)]).unwrap();

        let second = SharedArena::create(&loc, &corridor(), &[Position::new(1, 1)]);
        assert!(matches!(second, Err(MazeError::ArenaCreate { .. })));
    }

    #[test]
    fn test_attach_before_create() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SharedArena::attach(&location(&dir)),
            Err(MazeError::ArenaNotFound { .. })
        ));
    }

    #[test]
    fn test_attach_rejects_uninitialized_region() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(&dir);

        let file = fs::File::create(loc.region_path()).unwrap();
        file.set_len(ARENA_SIZE as u64).unwrap();
        assert!(matches!(
            SharedArena::attach(&loc),
            Err(MazeError::ArenaUninitialized { .. })
        ));

        file.set_len(16).unwrap();
        assert!(matches!(
            SharedArena::attach(&loc),
            Err(MazeError::ArenaUninitialized { .. })
        ));
    }

    #[test]
    fn test_create_rejects_bad_placements() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(&dir);

        // wall
        let wall = SharedArena::create(&loc, &corridor(), &[Position::new(0, 0)]);
        assert!(matches!(wall, Err(MazeError::ArenaCreate { .. })));
        // exit
        let exit = SharedArena::create(&loc, &corridor(), &[Position::new(6, 1)]);
        assert!(matches!(exit, Err(MazeError::ArenaCreate { .. })));
        let none = SharedArena::create(&loc, &corridor(), &[]);
        assert!(matches!(none, Err(MazeError::ArenaCreate { .. })));
        assert!(!loc.region_path().exists());
    }

    #[test]
    fn test_failed_create_leaves_no_region_behind() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(&dir);
        // a directory where the lock file belongs cannot be opened for writing
        fs::create_dir(loc.lock_path()).unwrap();

        let failed = SharedArena::create(&loc, &corridor(), &[Position::new(1, 1)]);
        assert!(matches!(failed, Err(MazeError::Lock(_))));
        assert!(!loc.region_path().exists());

        fs::remove_dir(loc.lock_path()).unwrap();
        assert!(SharedArena::create(&loc, &corridor(), &[Position::new(1, 1)]).is_ok());
    }

    #[test]
    fn test_quit_flag_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(&dir);
        let controller = SharedArena::create(&loc, &corridor(), &[Position::new(1, 1)]).unwrap();
        let runner = SharedArena::attach(&loc).unwrap();

        controller.request_quit().unwrap();
        assert!(runner.quit_requested().unwrap());
        assert!(runner.snapshot().unwrap().quit);
    }

    #[test]
    fn test_destroy_location_of_leftover() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(&dir);
        let arena = SharedArena::create(&loc, &corridor(), &[Position::new(1, 1)]).unwrap();
        std::mem::forget(arena);

        SharedArena::destroy_location(&loc).unwrap();
        assert!(SharedArena::create(&loc, &corridor(), &[Position::new(1, 1)]).is_ok());
    }
}
