//! Batch limiters: a fixed collection of work units, at most N running at once.

use std::time::Duration;

use conflux_common::{Result, error::Error};
use conflux_workflow::{
    join_handle::JoinHandle, semaphore::Semaphore, thread_pool::ThreadPool,
    wait_group::WaitGroup,
};

use crate::{
    failures::Failures,
    options::LimiterOptions,
    work_unit::{WorkUnit, run_isolated},
};

/// Runs batches of work units with at most `max_concurrency` of them in flight.
///
/// The caller's thread acquires a concurrency slot before handing each unit to the
/// pool, so submission itself is throttled: at most `max_concurrency` units are ever
/// queued on or running in the pool on behalf of this limiter.
pub struct WorkLimiter {
    max_concurrency: usize,
    slots: Semaphore,
    pool: ThreadPool,
}

impl WorkLimiter {
    /// Creates a limiter with a dedicated pool of `max_concurrency` threads.
    ///
    /// Fails with `InvalidArgument` when `max_concurrency` is 0.
    pub fn new(max_concurrency: usize) -> Result<WorkLimiter> {
        Self::with_options(LimiterOptions::new(max_concurrency))
    }

    pub fn with_options(options: LimiterOptions) -> Result<WorkLimiter> {
        options.validate()?;
        let max_concurrency = options.get_max_concurrency();
        Ok(WorkLimiter {
            max_concurrency,
            slots: Semaphore::new(max_concurrency),
            pool: options.build_pool(),
        })
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Number of units currently holding a concurrency slot.
    pub fn in_flight(&self) -> usize {
        self.max_concurrency - self.slots.available()
    }

    /// Bounded-Blocking: runs every unit and returns once all of them have finished.
    ///
    /// The result holds exactly one failure per failed unit, in submission order.
    pub fn run_blocking<I>(&self, units: I) -> Vec<Error>
    where
        I: IntoIterator<Item = WorkUnit>,
    {
        let handles = units
            .into_iter()
            .map(|unit| {
                let permit = self.slots.acquire();
                self.pool.spawn(move || {
                    let _permit = permit;
                    run_isolated(unit)
                })
            })
            .collect::<Vec<_>>();
        let submitted = handles.len();
        let failures = JoinHandle::join_all(handles)
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        log::debug!(
            "run_blocking: {submitted} units finished, {} failed",
            failures.len()
        );
        failures
    }

    /// Bounded-Immediate: submits every unit and returns without waiting for the
    /// last ones to finish.
    ///
    /// Submission still blocks while all slots are taken, so the call returns once
    /// the final unit has been handed to a worker. The returned [`FailureReport`]
    /// reflects only units that have completed at the time it is read; use
    /// [`FailureReport::wait`] for the complete list.
    pub fn run_detached<I>(&self, units: I) -> FailureReport
    where
        I: IntoIterator<Item = WorkUnit>,
    {
        let failures = Failures::new();
        let in_flight = WaitGroup::new();
        let mut submitted = 0;
        for unit in units {
            let permit = self.slots.acquire();
            let guard = in_flight.add();
            let failures = failures.clone();
            self.pool.spawn_detached(move || {
                let _permit = permit;
                let _guard = guard;
                if let Some(failure) = run_isolated(unit) {
                    failures.record(failure);
                }
            });
            submitted += 1;
        }
        log::debug!(
            "run_detached: {submitted} units submitted, {} still running",
            in_flight.pending()
        );
        FailureReport {
            failures,
            in_flight,
            submitted,
        }
    }
}

impl std::fmt::Debug for WorkLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkLimiter")
            .field("max_concurrency", &self.max_concurrency)
            .field("in_flight", &self.in_flight())
            .field("pool", &self.pool)
            .finish()
    }
}

/// Failures of a detached batch, readable while the batch is still running.
#[derive(Debug)]
pub struct FailureReport {
    failures: Failures,
    in_flight: WaitGroup,
    submitted: usize,
}

impl FailureReport {
    /// Number of units in the batch.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Number of units that have not finished yet.
    pub fn pending(&self) -> usize {
        self.in_flight.pending()
    }

    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Number of failures recorded so far. Partial while the batch is running.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Takes the failures recorded so far. Failures taken here are not returned
    /// again by [`wait`](Self::wait).
    pub fn take_completed(&self) -> Vec<Error> {
        self.failures.drain()
    }

    /// Waits up to `timeout` for the batch to finish. Returns `true` if it did.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.in_flight.wait_timeout(timeout)
    }

    /// Waits for every unit of the batch and returns the failures not yet taken.
    pub fn wait(self) -> Vec<Error> {
        self.in_flight.wait();
        self.failures.drain()
    }
}
