//! # Conflux: thread-backed streaming pipelines and concurrency limiters
//!
//! Conflux provides two independent building blocks for running work on OS threads:
//!
//! * **Streaming pipelines** - a source Stream produced from an in-memory collection,
//!   a chain of stage operators (transform, filter, reduce) each running on its own
//!   thread, and a terminal that drains the result. Stages are connected by hand-off
//!   channels, so a slow consumer applies backpressure to every stage upstream.
//! * **Work limiters** - run many independent fallible work units with at most N
//!   executing at once, collecting every failure. Batches can be run to completion,
//!   submitted without waiting, or fed one unit at a time to a queued limiter.
//!
//! This crate re-exports the component crates so that users can depend on a single
//! crate.
//!
//! ## Module Organization
//!
//! * [`common`] - Error type and result alias shared by all components
//! * [`stream`] - Streams, producers, stage operators and pipelines
//! * [`limiter`] - Bounded-Blocking, Bounded-Immediate and Bounded-Queued limiters
//! * [`workflow`] - Threading primitives: hand-off channels, thread pool, semaphore,
//!   wait group and cancellation flag

pub use conflux_common as common;
pub use conflux_limiter as limiter;
pub use conflux_stream as stream;
pub use conflux_workflow as workflow;
