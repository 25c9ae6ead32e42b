//! Blocking hand-off channels.
//!
//! A hand-off channel moves values between threads through a shared queue guarded by a
//! mutex and two condition variables. Three flavors are available:
//!
//! - [`rendezvous`]: no buffer at all. [`Sender::send`] returns only after a receiver
//!   has taken the value (or every receiver is gone). This is the natural backpressure
//!   primitive for streaming stages.
//! - [`bounded`]: at most `bound` values are buffered; `send` blocks while the buffer
//!   is full.
//! - [`unbounded`]: `send` never blocks.
//!
//! Both halves can be cloned. The channel is *half-closed* once every [`Sender`] is
//! dropped: receivers drain whatever is left and then observe the end of the channel.
//! It is *closed* once every [`Receiver`] is dropped: buffered values are discarded and
//! every subsequent send fails, handing the value back to the caller.

use std::collections::VecDeque;
use std::sync::mpsc::{RecvError, RecvTimeoutError, SendError, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Creates a channel without a buffer: every send waits for the matching receive.
pub fn rendezvous<T>() -> (Sender<T>, Receiver<T>) {
    with_capacity(Capacity::Rendezvous)
}

/// Creates a channel buffering up to `bound` values.
///
/// A `bound` of zero is the same as [`rendezvous`].
pub fn bounded<T>(bound: usize) -> (Sender<T>, Receiver<T>) {
    if bound == 0 {
        rendezvous()
    } else {
        with_capacity(Capacity::Bounded(bound))
    }
}

/// Creates a channel with an unlimited buffer.
pub fn unbounded<T>() -> (Sender<T>, Receiver<T>) {
    with_capacity(Capacity::Unbounded)
}

fn with_capacity<T>(capacity: Capacity) -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            queue: VecDeque::new(),
            capacity,
            senders: 1,
            receivers: 1,
            sent: 0,
            received: 0,
        }),
        not_empty: Condvar::new(),
        not_full: Condvar::new(),
    });
    (Sender(shared.clone()), Receiver(shared))
}

/// The sending half of a hand-off channel.
pub struct Sender<T>(Arc<Shared<T>>);

impl<T> Sender<T> {
    /// Sends a value, blocking as dictated by the channel capacity.
    ///
    /// Fails, returning the value, when all receivers are gone. For a rendezvous
    /// channel `Ok` means a receiver took the value, unless the last receiver hung up
    /// while the value was still in flight; in that case the value is dropped.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let mut state = self.0.lock();
        loop {
            if state.receivers == 0 {
                return Err(SendError(value));
            }
            if state.has_room() {
                break;
            }
            state = self.0.wait_not_full(state);
        }

        state.queue.push_back(value);
        state.sent += 1;
        let ticket = state.sent;
        self.0.not_empty.notify_one();

        if state.capacity == Capacity::Rendezvous {
            while state.received < ticket && state.receivers > 0 {
                state = self.0.wait_not_full(state);
            }
        }
        Ok(())
    }

    /// Returns `true` when every receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.0.lock().receivers == 0
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.0.lock().senders += 1;
        Sender(self.0.clone())
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.senders -= 1;
        if state.senders == 0 {
            self.0.not_empty.notify_all();
        }
    }
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

/// The receiving half of a hand-off channel.
pub struct Receiver<T>(Arc<Shared<T>>);

impl<T> Receiver<T> {
    /// Blocks until a value is available, or returns `RecvError` once the channel is
    /// half-closed and drained.
    pub fn recv(&self) -> Result<T, RecvError> {
        let mut state = self.0.lock();
        loop {
            if let Some(value) = self.0.take(&mut state) {
                return Ok(value);
            }
            if state.senders == 0 {
                return Err(RecvError);
            }
            state = self.0.wait_not_empty(state);
        }
    }

    /// Like [`recv`](Self::recv), giving up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.0.lock();
        loop {
            if let Some(value) = self.0.take(&mut state) {
                return Ok(value);
            }
            if state.senders == 0 {
                return Err(RecvTimeoutError::Disconnected);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(RecvTimeoutError::Timeout);
            }
            let (guard, _) = self
                .0
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
    }

    /// Takes a buffered value without blocking.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut state = self.0.lock();
        if let Some(value) = self.0.take(&mut state) {
            return Ok(value);
        }
        if state.senders == 0 {
            Err(TryRecvError::Disconnected)
        } else {
            Err(TryRecvError::Empty)
        }
    }

    /// Returns `true` once every sender is gone and nothing is left to receive.
    pub fn is_terminated(&self) -> bool {
        let state = self.0.lock();
        state.senders == 0 && state.queue.is_empty()
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.0.lock().receivers += 1;
        Receiver(self.0.clone())
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.receivers -= 1;
        if state.receivers == 0 {
            state.queue.clear();
            self.0.not_full.notify_all();
        }
    }
}

impl<T> std::fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capacity {
    Rendezvous,
    Bounded(usize),
    Unbounded,
}

struct State<T> {
    queue: VecDeque<T>,
    capacity: Capacity,
    senders: usize,
    receivers: usize,
    /// Total number of values pushed; doubles as the rendezvous ticket counter.
    sent: u64,
    /// Total number of values taken.
    received: u64,
}

impl<T> State<T> {
    fn has_room(&self) -> bool {
        match self.capacity {
            // One value in flight at a time.
            Capacity::Rendezvous => self.queue.is_empty(),
            Capacity::Bounded(bound) => self.queue.len() < bound,
            Capacity::Unbounded => true,
        }
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap()
    }

    fn wait_not_full<'a>(&self, guard: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        self.not_full.wait(guard).unwrap()
    }

    fn wait_not_empty<'a>(&self, guard: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        self.not_empty.wait(guard).unwrap()
    }

    fn take(&self, state: &mut MutexGuard<'_, State<T>>) -> Option<T> {
        let value = state.queue.pop_front()?;
        state.received += 1;
        // Rendezvous senders wait on `not_full` for their own ticket, so all of them
        // must re-check.
        if state.capacity == Capacity::Rendezvous {
            self.not_full.notify_all();
        } else {
            self.not_full.notify_one();
        }
        Some(value)
    }
}
