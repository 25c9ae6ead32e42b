//! Fixed-size thread pool fed by an unbounded hand-off queue.
//!
//! Work items are either awaited through a [`JoinHandle`] ([`ThreadPool::spawn`]) or
//! run fire-and-forget ([`ThreadPool::spawn_detached`]). Worker threads exit once the
//! last clone of the pool is dropped and the queue has been drained, so queued work is
//! never lost.

use crate::{
    handoff::{self, Receiver, Sender},
    join_handle::JoinHandle,
    oneshot,
};
use std::thread;

/// A pool of worker threads pulling tasks from a shared queue.
///
/// Clones share the same workers.
#[derive(Clone)]
pub struct ThreadPool {
    queue: Sender<Task>,
    num_threads: usize,
}

type Task = Box<dyn FnOnce() + Send + 'static>;

impl ThreadPool {
    /// Creates a pool with `num_threads` unnamed workers.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is 0.
    pub fn new(num_threads: usize) -> Self {
        Self::with_thread_name(num_threads, |_| String::new())
    }

    /// Creates a pool whose worker `i` is named `thread_name(i)`. An empty name leaves
    /// the thread unnamed.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is 0 or a worker thread cannot be spawned.
    pub fn with_thread_name(num_threads: usize, thread_name: impl Fn(usize) -> String) -> Self {
        assert_ne!(num_threads, 0);

        let (tx, rx) = handoff::unbounded::<Task>();
        for i in 0..num_threads {
            let rx = rx.clone();
            let mut builder = thread::Builder::new();
            let name = thread_name(i);
            if !name.is_empty() {
                builder = builder.name(name);
            }
            builder
                .spawn(move || Self::thread_fn(rx))
                .expect("spawn thread");
        }

        ThreadPool {
            queue: tx,
            num_threads,
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Runs `f` on a worker and returns a handle to its result.
    pub fn spawn<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx_result, rx_result) = oneshot::channel::<R>();
        self.spawn_detached(move || {
            let _ = tx_result.send(f());
        });
        JoinHandle::new(rx_result)
    }

    /// Runs `f` on a worker without a way to wait for it.
    pub fn spawn_detached<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue
            .send(Box::new(f))
            .unwrap_or_else(|_| panic!("thread pool has no listening workers"));
    }

    fn thread_fn(rx: Receiver<Task>) {
        while let Ok(task) = rx.recv() {
            task();
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads)
            .finish()
    }
}
