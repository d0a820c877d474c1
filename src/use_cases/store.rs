// Authoritative simulation store shared by the run tasks.

use crate::domain::World;
use std::sync::{Arc, Mutex, PoisonError};

/// Single mutable cell every run task reads and writes.
///
/// Critical sections are short and never span an await, so a blocking mutex is enough.
#[derive(Debug, Clone, Default)]
pub struct Store {
    world: Arc<Mutex<World>>,
}

impl Store {
    pub fn new(world: World) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        let guard = self.world.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        let mut guard = self.world.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Consistent copy of the whole world taken under one lock.
    pub fn copy(&self) -> World {
        self.read(World::clone)
    }
}
