//! Counter of outstanding tasks that can be waited on until it drops to zero.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Tracks a dynamic set of in-flight tasks.
///
/// Each task holds a [`WaitGuard`] obtained from [`add`](WaitGroup::add); the group is
/// quiescent once every guard has been dropped.
#[derive(Clone, Default)]
pub struct WaitGroup(Arc<Tracker>);

#[derive(Default)]
struct Tracker {
    pending: Mutex<usize>,
    idle: Condvar,
}

impl WaitGroup {
    pub fn new() -> WaitGroup {
        WaitGroup::default()
    }

    /// Registers one more task.
    pub fn add(&self) -> WaitGuard {
        *self.0.pending.lock().unwrap() += 1;
        WaitGuard(self.0.clone())
    }

    /// Number of tasks still holding a guard.
    pub fn pending(&self) -> usize {
        *self.0.pending.lock().unwrap()
    }

    /// Blocks until no task is pending.
    pub fn wait(&self) {
        let pending = self.0.pending.lock().unwrap();
        let _guard = self
            .0
            .idle
            .wait_while(pending, |pending| *pending != 0)
            .unwrap();
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`. Returns `true` if the group
    /// became idle.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let pending = self.0.pending.lock().unwrap();
        let (pending, _) = self
            .0
            .idle
            .wait_timeout_while(pending, timeout, |pending| *pending != 0)
            .unwrap();
        *pending == 0
    }
}

impl std::fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitGroup")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Marks one task of a [`WaitGroup`] as in flight until dropped.
#[must_use = "the task is considered finished as soon as the guard is dropped"]
pub struct WaitGuard(Arc<Tracker>);

impl Drop for WaitGuard {
    fn drop(&mut self) {
        let mut pending = self.0.pending.lock().unwrap();
        *pending -= 1;
        if *pending == 0 {
            self.0.idle.notify_all();
        }
    }
}
