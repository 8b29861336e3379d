use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::Store;
use crate::error::{GameError, GameResult};
use crate::model::World;

/// An in-process store, optionally snapshotted to a JSON file after every
/// committed transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    world: Mutex<World>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_world(world: World) -> Self {
        MemoryStore {
            world: Mutex::new(world),
            path: None,
        }
    }

    /// Loads the snapshot at `path`, or starts empty if there is none yet.
    pub fn open(path: impl Into<PathBuf>) -> GameResult<Self> {
        let path = path.into();
        let world = if path.exists() {
            let raw = fs::read(&path).map_err(|e| store_error(&path, e))?;
            serde_json::from_slice(&raw).map_err(|e| store_error(&path, e))?
        } else {
            World::new()
        };
        tracing::info!(path = %path.display(), villages = world.villages.len(), "opened world");
        Ok(MemoryStore {
            world: Mutex::new(world),
            path: Some(path),
        })
    }

    /// A copy of the committed world.
    pub fn snapshot(&self) -> GameResult<World> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> GameResult<MutexGuard<'_, World>> {
        self.world
            .lock()
            .map_err(|_| GameError::TransientStore("world lock poisoned".into()))
    }

    fn persist(&self, world: &World) -> GameResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        let raw = serde_json::to_vec(world).map_err(|e| store_error(path, e))?;
        fs::write(&tmp, raw).map_err(|e| store_error(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| store_error(path, e))?;
        Ok(())
    }
}

fn store_error(path: &Path, err: impl std::fmt::Display) -> GameError {
    GameError::TransientStore(format!("{}: {err}", path.display()))
}

impl Store for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> GameResult<T>
    where
        F: FnOnce(&mut World) -> GameResult<T>,
    {
        let mut committed = self.lock()?;
        let mut working = committed.clone();
        let value = f(&mut working)?;
        self.persist(&working)?;
        *committed = working;
        Ok(value)
    }

    fn read<T, F>(&self, f: F) -> GameResult<T>
    where
        F: FnOnce(&World) -> T,
    {
        let world = self.lock()?;
        Ok(f(&*world))
    }
}
