//! Cooperative cancellation signal.
//!
//! Nothing in this crate preempts running work. Long-running tasks poll a
//! [`CancellationFlag`] and return [`ErrorKind::Cancelled`] when it is raised.
//!
//! [`ErrorKind::Cancelled`]: conflux_common::error::ErrorKind::Cancelled

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use conflux_common::{Result, error::Error};

/// A shared flag that, once raised, stays raised.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> CancellationFlag {
        CancellationFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns the cancellation failure if the flag is raised.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::cancelled())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CancellationFlag;

    #[test]
    fn test_cancellation_flag() {
        let flag = CancellationFlag::new();
        let observer = flag.clone();
        assert!(observer.check().is_ok());

        flag.cancel();
        assert!(observer.is_cancelled());
        assert!(observer.check().unwrap_err().is_cancelled());

        flag.cancel();
        assert!(flag.is_cancelled());
    }
}
