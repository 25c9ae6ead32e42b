//! Counting semaphore with owned, RAII permits.
//!
//! A [`Permit`] holds one slot of the semaphore's capacity and returns it on drop.
//! Permits own a reference to the semaphore, so they can be moved into a task running
//! on another thread and released there.

use std::sync::{Arc, Condvar, Mutex};

/// A counting semaphore bounding how many holders may proceed at once.
#[derive(Clone)]
pub struct Semaphore(Arc<SemaphoreCore>);

impl Semaphore {
    /// Creates a semaphore with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0: such a semaphore could never be acquired.
    pub fn new(capacity: usize) -> Semaphore {
        assert_ne!(capacity, 0, "semaphore capacity must be at least 1");
        Semaphore(Arc::new(SemaphoreCore {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }))
    }

    pub fn capacity(&self) -> usize {
        self.0.capacity
    }

    /// Number of free slots. Stale as soon as it is returned.
    pub fn available(&self) -> usize {
        *self.0.available.lock().unwrap()
    }

    /// Blocks until a slot is free and takes it.
    pub fn acquire(&self) -> Permit {
        let available = self.0.available.lock().unwrap();
        let mut available = self
            .0
            .released
            .wait_while(available, |available| *available == 0)
            .unwrap();
        *available -= 1;
        Permit(Some(self.0.clone()))
    }

    /// Takes a slot if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut available = self.0.available.lock().unwrap();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(Permit(Some(self.0.clone())))
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .finish()
    }
}

/// One acquired slot; released when dropped.
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct Permit(Option<Arc<SemaphoreCore>>);

impl Permit {
    /// Releases the slot now instead of at drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(core) = self.0.take() {
            let mut available = core.available.lock().unwrap();
            *available += 1;
            debug_assert!(*available <= core.capacity);
            drop(available);
            core.released.notify_one();
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit").finish_non_exhaustive()
    }
}

struct SemaphoreCore {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}
