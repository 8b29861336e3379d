//! Persistence seam.
//!
//! Every mutation of the world goes through `Store::transaction`: the closure
//! sees a working copy and its changes become visible, and durable, only if
//! it returns `Ok`.

mod memory;

pub use memory::MemoryStore;

use crate::error::GameResult;
use crate::model::World;

pub trait Store: Send + Sync {
    /// Runs `f` atomically against the world.
    fn transaction<T, F>(&self, f: F) -> GameResult<T>
    where
        F: FnOnce(&mut World) -> GameResult<T>;

    /// Runs `f` against a consistent view of the world.
    fn read<T, F>(&self, f: F) -> GameResult<T>
    where
        F: FnOnce(&World) -> T;
}
