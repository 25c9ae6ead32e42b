//! Concurrency limiters: run caller-supplied work units with at most N of them
//! executing at the same time.
//!
//! Three variants share the same bound and failure collection:
//!
//! - Bounded-Blocking ([`WorkLimiter::run_blocking`]) runs a batch and returns every
//!   failure once the whole batch is done.
//! - Bounded-Immediate ([`WorkLimiter::run_detached`]) submits a batch and returns a
//!   [`FailureReport`] that can be read while units are still running.
//! - Bounded-Queued ([`QueuedLimiter`]) accepts units one at a time between `start`
//!   and `stop`.
//!
//! A unit that panics is reported as a failure; it never brings down a worker.

pub mod bounded;
pub mod failures;
pub mod options;
pub mod queued;
pub mod work_unit;

pub use bounded::{FailureReport, WorkLimiter};
pub use options::LimiterOptions;
pub use queued::{LimiterState, QueuedLimiter};
pub use work_unit::{WorkUnit, work_unit};
