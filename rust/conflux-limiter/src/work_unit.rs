//! Work units and the isolated execution of a single unit.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use conflux_common::{Result, error::Error};

/// A zero-argument task that either succeeds or reports a failure.
///
/// Whatever state the closure captures is owned by the caller; limiters only run it.
pub type WorkUnit = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// Boxes a closure into a [`WorkUnit`].
pub fn work_unit<F>(f: F) -> WorkUnit
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    Box::new(f)
}

/// Runs `unit`, turning a panic into a [`WorkUnitPanicked`] failure so that one
/// misbehaving unit cannot take down the worker it runs on.
///
/// [`WorkUnitPanicked`]: conflux_common::error::ErrorKind::WorkUnitPanicked
pub(crate) fn run_isolated(unit: WorkUnit) -> Option<Error> {
    match panic::catch_unwind(AssertUnwindSafe(unit)) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::warn!("work unit panicked: {message}");
            Some(Error::panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
