//! The Stream primitive: a single-producer, single-consumer channel of typed values
//! with an explicit end.
//!
//! A Stream is created together with its [`StreamWriter`]. The writer is owned by
//! exactly one producing task; dropping it closes the Stream, which therefore happens
//! exactly once and only after every value has been written. The reading side is
//! consumed through [`Iterator`]: `next()` blocks until a value is available and
//! returns `None` once the Stream is closed and drained.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use conflux_workflow::handoff::{self, Receiver, Sender};

use crate::options::StreamOptions;

/// Identifies a Stream for the whole life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    fn next() -> StreamId {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        StreamId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// The reading side of a Stream.
pub struct Stream<T> {
    id: StreamId,
    rx: Receiver<T>,
}

/// The writing side of a Stream. Closes the Stream when dropped.
pub struct StreamWriter<T> {
    id: StreamId,
    tx: Sender<T>,
}

impl<T> Stream<T> {
    /// Creates an unbuffered Stream.
    pub fn channel() -> (StreamWriter<T>, Stream<T>) {
        Self::channel_with_capacity(StreamOptions::DEFAULT_CAPACITY)
    }

    /// Creates a Stream that lets its writer run up to `capacity` values ahead of the
    /// reader; zero means unbuffered.
    pub fn channel_with_capacity(capacity: usize) -> (StreamWriter<T>, Stream<T>) {
        let (tx, rx) = handoff::bounded(capacity);
        Self::from_parts(tx, rx)
    }

    /// Creates a Stream whose writer never blocks.
    pub fn unbounded() -> (StreamWriter<T>, Stream<T>) {
        let (tx, rx) = handoff::unbounded();
        Self::from_parts(tx, rx)
    }

    /// A Stream that is already closed.
    pub fn empty() -> Stream<T> {
        let (writer, stream) = Self::channel();
        writer.close();
        stream
    }

    fn from_parts(tx: Sender<T>, rx: Receiver<T>) -> (StreamWriter<T>, Stream<T>) {
        let id = StreamId::next();
        (StreamWriter { id, tx }, Stream { id, rx })
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Blocks for the next value; `None` means the Stream is closed and drained.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Returns the next value if one is ready. `Ok(None)` means the Stream is closed
    /// and drained; `Err` means the producer is still running.
    pub fn try_recv(&self) -> Result<Option<T>, TryRecvError> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(TryRecvError::Disconnected) => Ok(None),
            Err(TryRecvError::Empty) => Err(TryRecvError::Empty),
        }
    }

    /// Like [`recv`](Self::recv), giving up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>, RecvTimeoutError> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Ok(Some(value)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(RecvTimeoutError::Timeout),
        }
    }

    /// Returns `true` once the writer is gone and every value has been read.
    pub fn is_drained(&self) -> bool {
        self.rx.is_terminated()
    }
}

impl<T> Iterator for Stream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.recv()
    }
}

impl<T> std::fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").field("id", &self.id).finish()
    }
}

impl<T> StreamWriter<T> {
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Writes one value, blocking until the reader has room for it.
    ///
    /// Hands the value back if the reader has been dropped.
    pub fn send(&self, value: T) -> Result<(), T> {
        self.tx.send(value).map_err(|e| e.0)
    }

    /// Returns `true` once the reading side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Closes the Stream. Equivalent to dropping the writer.
    pub fn close(self) {}
}

impl<T> std::fmt::Debug for StreamWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter").field("id", &self.id).finish()
    }
}

/// Runs `body` on a dedicated thread named after `stage`.
pub(crate) fn spawn_stage<F>(options: &StreamOptions, stage: &str, body: F)
where
    F: FnOnce() + Send + 'static,
{
    let mut builder = thread::Builder::new();
    if let Some(name) = options.stage_thread_name(stage) {
        builder = builder.name(name);
    }
    builder.spawn(body).expect("spawn stage thread");
}
