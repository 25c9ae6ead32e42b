use std::sync::{Arc, Mutex};

use conflux_common::error::Error;

/// Failure accumulator shared by concurrently running work units.
///
/// Every append goes through the mutex; the order of the collected failures is the
/// order in which units finished, which is arbitrary.
#[derive(Clone, Default)]
pub struct Failures(Arc<Mutex<Vec<Error>>>);

impl Failures {
    pub fn new() -> Failures {
        Failures::default()
    }

    pub fn record(&self, failure: Error) {
        self.0.lock().unwrap().push(failure);
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes every failure recorded so far.
    pub fn drain(&self) -> Vec<Error> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl std::fmt::Debug for Failures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Failures")
            .field("len", &self.len())
            .finish()
    }
}
