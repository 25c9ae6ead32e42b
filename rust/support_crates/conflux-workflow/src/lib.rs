//! Threading primitives shared by the conflux streaming and work-limiting crates.
//!
//! # Key Components
//!
//! ## Channels
//!
//! - [`handoff`] - Blocking channels with rendezvous, bounded and unbounded capacity.
//!   A rendezvous channel is the backpressure primitive behind every pipeline stage.
//! - [`oneshot`] - Single-value channel carrying a task result back to its joiner.
//!
//! ## Execution
//!
//! - [`thread_pool::ThreadPool`] - A fixed-size pool of worker threads.
//! - [`join_handle::JoinHandle`] - Waits for the result of a pool task.
//!
//! ## Coordination
//!
//! - [`semaphore::Semaphore`] - Counting semaphore with owned permits, used to cap the
//!   number of concurrently running tasks.
//! - [`wait_group::WaitGroup`] - Waits for a dynamic set of in-flight tasks.
//! - [`cancellation::CancellationFlag`] - Cooperative cancellation signal.

pub mod cancellation;
pub mod handoff;
pub mod join_handle;
pub mod oneshot;
pub mod semaphore;
pub mod thread_pool;
pub mod wait_group;
