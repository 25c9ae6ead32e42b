//! Handle for waiting on the result of a task submitted to a [`ThreadPool`].
//!
//! [`ThreadPool`]: crate::thread_pool::ThreadPool

use crate::oneshot::OneshotReceiver;

/// A handle for waiting on the result of a pool task.
///
/// The handle moves from *pending* (task queued or running) to *ready* (result
/// delivered) and is consumed by [`join`](Self::join).
pub struct JoinHandle<R>(OneshotReceiver<R>);

impl<R> JoinHandle<R> {
    pub(crate) fn new(rx: OneshotReceiver<R>) -> JoinHandle<R> {
        JoinHandle(rx)
    }

    /// Returns `true` once the task has delivered its result.
    pub(crate) fn is_ready(&self) -> bool {
        !self.0.is_pending()
    }

    /// Waits for the task and returns its result.
    ///
    /// # Panics
    ///
    /// Panics if the task was dropped without producing a result, which only happens
    /// when the task itself panicked.
    pub fn join(self) -> R {
        self.0.recv().expect("task completed without a result")
    }

    /// Waits for every handle, returning results in handle order.
    pub fn join_all(handles: impl IntoIterator<Item = JoinHandle<R>>) -> Vec<R> {
        handles.into_iter().map(|h| h.join()).collect()
    }
}

impl<R> std::fmt::Debug for JoinHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::JoinHandle;
    use crate::oneshot;

    #[test]
    fn test_join_handle() {
        let (tx, rx) = oneshot::channel();
        let pending = JoinHandle::new(rx);
        assert!(!pending.is_ready());
        tx.send("done").unwrap();
        assert!(pending.is_ready());
        assert_eq!(pending.join(), "done");

        let handles = (0..4)
            .map(|i| {
                let (tx, rx) = oneshot::channel();
                tx.send(i * 10).unwrap();
                JoinHandle::new(rx)
            })
            .collect::<Vec<_>>();
        assert_eq!(JoinHandle::join_all(handles), vec![0, 10, 20, 30]);
    }

    #[test]
    #[should_panic(expected = "task completed without a result")]
    fn test_join_dropped_task() {
        let (tx, rx) = oneshot::channel::<u32>();
        drop(tx);
        JoinHandle::new(rx).join();
    }
}
