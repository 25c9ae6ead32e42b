//! A long-lived limiter fed one work unit at a time.

use std::sync::Mutex;
use std::thread;

use conflux_common::{Result, error::Error};
use conflux_workflow::{
    handoff::{self, Receiver, Sender},
    semaphore::Semaphore,
    thread_pool::ThreadPool,
    wait_group::{WaitGroup, WaitGuard},
};

use crate::{
    failures::Failures,
    options::LimiterOptions,
    work_unit::{WorkUnit, run_isolated, work_unit},
};

/// Lifecycle of a [`QueuedLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterState {
    /// Constructed, not started. Units cannot be added yet.
    Created,
    /// Accepting units.
    Started,
    /// Intake closed; the dispatcher is still handing out queued units.
    Stopped,
    /// Every unit has been dispatched; some are still running.
    Draining,
    /// Stopped with nothing left running. Failures are complete.
    Quiesced,
}

enum Phase {
    Created,
    Started {
        intake: Sender<WorkUnit>,
        dispatcher: thread::JoinHandle<()>,
    },
    Stopped {
        dispatcher: thread::JoinHandle<()>,
    },
    Waited,
}

/// Bounded-Queued limiter: units are added while it runs, and a dispatcher thread
/// feeds them to the pool with at most `max_concurrency` in flight.
///
/// ```text
/// Created --start--> Started --stop--> Stopped -> Draining -> Quiesced
/// ```
///
/// `add` blocks while the intake is full, which with the default unbuffered intake
/// means until the dispatcher has claimed the unit. Units are dispatched in the order
/// they were added.
pub struct QueuedLimiter {
    options: LimiterOptions,
    phase: Mutex<Phase>,
    failures: Failures,
    in_flight: WaitGroup,
    dispatching: WaitGroup,
}

impl QueuedLimiter {
    /// Creates a stopped limiter allowing at most `max_concurrency` units at once.
    pub fn new(max_concurrency: usize) -> Result<QueuedLimiter> {
        Self::with_options(LimiterOptions::new(max_concurrency))
    }

    pub fn with_options(options: LimiterOptions) -> Result<QueuedLimiter> {
        options.validate()?;
        Ok(QueuedLimiter {
            options,
            phase: Mutex::new(Phase::Created),
            failures: Failures::new(),
            in_flight: WaitGroup::new(),
            dispatching: WaitGroup::new(),
        })
    }

    pub fn max_concurrency(&self) -> usize {
        self.options.get_max_concurrency()
    }

    /// Starts the dispatcher. A limiter can be started only once.
    pub fn start(&self) -> Result<()> {
        let mut phase = self.phase.lock().unwrap();
        if !matches!(*phase, Phase::Created) {
            return Err(Error::invalid_operation(
                "QueuedLimiter::start: limiter was already started",
            ));
        }

        let (intake, queue) = handoff::bounded(self.options.get_intake_capacity());
        let dispatcher = Dispatcher {
            queue,
            slots: Semaphore::new(self.max_concurrency()),
            pool: self.options.build_pool(),
            failures: self.failures.clone(),
            in_flight: self.in_flight.clone(),
            _running: self.dispatching.add(),
        };
        let dispatcher = thread::Builder::new()
            .name(format!("{}-dispatch", self.options.get_thread_name()))
            .spawn(move || dispatcher.run())
            .map_err(|e| Error::work_unit_source("spawn limiter dispatcher", e))?;

        *phase = Phase::Started { intake, dispatcher };
        log::debug!(
            "queued limiter started, max_concurrency {}",
            self.max_concurrency()
        );
        Ok(())
    }

    /// Submits a unit. Fails with `InvalidOperation` before `start` and after `stop`.
    pub fn add<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.add_unit(work_unit(f))
    }

    pub fn add_unit(&self, unit: WorkUnit) -> Result<()> {
        // Clone the intake so that a blocked send does not hold the lock and `stop`
        // can still proceed.
        let intake = match &*self.phase.lock().unwrap() {
            Phase::Started { intake, .. } => intake.clone(),
            Phase::Created => {
                return Err(Error::invalid_operation(
                    "QueuedLimiter::add: limiter is not started",
                ));
            }
            Phase::Stopped { .. } | Phase::Waited => {
                return Err(Error::invalid_operation(
                    "QueuedLimiter::add: limiter is stopped",
                ));
            }
        };
        intake
            .send(unit)
            .map_err(|_| Error::disconnected("queued limiter dispatcher"))
    }

    /// Closes the intake. Units already added are still run. Stopping twice is a no-op.
    pub fn stop(&self) -> Result<()> {
        let mut phase = self.phase.lock().unwrap();
        match std::mem::replace(&mut *phase, Phase::Created) {
            Phase::Created => Err(Error::invalid_operation(
                "QueuedLimiter::stop: limiter is not started",
            )),
            Phase::Started { intake, dispatcher } => {
                drop(intake);
                *phase = Phase::Stopped { dispatcher };
                log::debug!("queued limiter stopped");
                Ok(())
            }
            stopped => {
                *phase = stopped;
                Ok(())
            }
        }
    }

    /// Waits until every added unit has finished and returns the failures collected
    /// since the limiter started. Must be called after [`stop`](Self::stop).
    ///
    /// The failure list is handed out once: any later call, including one racing
    /// with the first, fails with `InvalidOperation`.
    pub fn wait(&self) -> Result<Vec<Error>> {
        let dispatcher = {
            let mut phase = self.phase.lock().unwrap();
            match std::mem::replace(&mut *phase, Phase::Waited) {
                Phase::Stopped { dispatcher } => dispatcher,
                Phase::Waited => {
                    return Err(Error::invalid_operation(
                        "QueuedLimiter::wait: failures were already collected",
                    ));
                }
                other => {
                    *phase = other;
                    return Err(Error::invalid_operation(
                        "QueuedLimiter::wait: limiter is not stopped",
                    ));
                }
            }
        };
        dispatcher
            .join()
            .map_err(|_| Error::panicked("queued limiter dispatcher"))?;
        self.in_flight.wait();
        log::debug!("queued limiter quiesced");
        Ok(self.failures.drain())
    }

    /// Stops the limiter and waits for it to quiesce.
    pub fn stop_and_wait(&self) -> Result<Vec<Error>> {
        self.stop()?;
        self.wait()
    }

    /// Number of failures recorded so far. Partial until the limiter quiesces.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Number of dispatched units that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.pending()
    }

    pub fn state(&self) -> LimiterState {
        match &*self.phase.lock().unwrap() {
            Phase::Created => LimiterState::Created,
            Phase::Started { .. } => LimiterState::Started,
            Phase::Stopped { .. } | Phase::Waited => {
                if self.dispatching.pending() > 0 {
                    LimiterState::Stopped
                } else if self.in_flight.pending() > 0 {
                    LimiterState::Draining
                } else {
                    LimiterState::Quiesced
                }
            }
        }
    }
}

impl std::fmt::Debug for QueuedLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedLimiter")
            .field("max_concurrency", &self.max_concurrency())
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Owns the receiving end of the intake. Runs on its own thread rather than on the
/// pool, which may have a single worker.
struct Dispatcher {
    queue: Receiver<WorkUnit>,
    slots: Semaphore,
    pool: ThreadPool,
    failures: Failures,
    in_flight: WaitGroup,
    /// Held until the intake is closed and every unit has been handed to the pool.
    _running: WaitGuard,
}

impl Dispatcher {
    fn run(self) {
        let mut dispatched = 0usize;
        while let Ok(unit) = self.queue.recv() {
            let permit = self.slots.acquire();
            let guard = self.in_flight.add();
            let failures = self.failures.clone();
            log::trace!("dispatching unit {dispatched}");
            self.pool.spawn_detached(move || {
                let _permit = permit;
                let _guard = guard;
                if let Some(failure) = run_isolated(unit) {
                    failures.record(failure);
                }
            });
            dispatched += 1;
        }
        log::debug!("queued limiter intake closed after {dispatched} units");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_common::error::ErrorKind;
    use conflux_workflow::cancellation::CancellationFlag;
    use std::collections::HashSet;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use std::time::Duration;

    fn jitter() {
        thread::sleep(Duration::from_micros(fastrand::u64(0..400)));
    }

    #[test]
    fn test_lifecycle() {
        let limiter = QueuedLimiter::new(2).unwrap();
        assert_eq!(limiter.state(), LimiterState::Created);
        assert!(limiter.add(|| Ok(())).is_err());
        assert!(limiter.stop().is_err());
        assert!(limiter.wait().is_err());

        limiter.start().unwrap();
        assert_eq!(limiter.state(), LimiterState::Started);
        assert!(limiter.start().is_err());
        assert!(limiter.wait().is_err());
        limiter.add(|| Ok(())).unwrap();

        limiter.stop().unwrap();
        limiter.stop().unwrap();
        let err = limiter.add(|| Ok(())).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));

        assert!(limiter.wait().unwrap().is_empty());
        assert_eq!(limiter.state(), LimiterState::Quiesced);
        assert!(limiter.start().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(QueuedLimiter::new(0).is_err());
    }

    #[test]
    fn test_failures_complete_after_stop() {
        let limiter = QueuedLimiter::new(3).unwrap();
        limiter.start().unwrap();
        for i in 0..100 {
            limiter
                .add(move || {
                    jitter();
                    if i % 7 == 0 {
                        Err(Error::work_unit(i.to_string()))
                    } else {
                        Ok(())
                    }
                })
                .unwrap();
        }
        let failures = limiter.stop_and_wait().unwrap();
        let ids = failures
            .iter()
            .map(|e| match e.kind() {
                ErrorKind::WorkUnit { message, .. } => message.parse::<u32>().unwrap(),
                other => panic!("unexpected failure {other:?}"),
            })
            .collect::<HashSet<_>>();
        assert_eq!(failures.len(), ids.len());
        assert_eq!(ids, (0..100).filter(|i| i % 7 == 0).collect::<HashSet<_>>());
    }

    #[test]
    fn test_peak_concurrency_bounded() {
        for max in [1, 4, 64] {
            let options = LimiterOptions::new(max).intake_capacity(16);
            let limiter = QueuedLimiter::with_options(options).unwrap();
            let current = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));
            limiter.start().unwrap();
            for _ in 0..300 {
                let current = current.clone();
                let peak = peak.clone();
                limiter
                    .add(move || {
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        jitter();
                        current.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
            }
            assert!(limiter.stop_and_wait().unwrap().is_empty());
            let peak = peak.load(Ordering::SeqCst);
            assert!(peak >= 1 && peak <= max, "peak {peak} with max {max}");
        }
    }

    #[test]
    fn test_concurrent_adders() {
        let limiter = Arc::new(QueuedLimiter::new(4).unwrap());
        limiter.start().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        thread::scope(|s| {
            for _ in 0..4 {
                let limiter = limiter.clone();
                let ran = ran.clone();
                s.spawn(move || {
                    for _ in 0..50 {
                        let ran = ran.clone();
                        limiter
                            .add(move || {
                                ran.fetch_add(1, Ordering::SeqCst);
                                Err(Error::work_unit("counted"))
                            })
                            .unwrap();
                    }
                });
            }
        });
        let failures = limiter.stop_and_wait().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 200);
        assert_eq!(failures.len(), 200);
    }

    #[test]
    fn test_panic_and_cancellation() {
        let limiter = QueuedLimiter::new(1).unwrap();
        let cancel = CancellationFlag::new();
        limiter.start().unwrap();
        limiter.add(|| panic!("queued unit panicked")).unwrap();
        limiter.add(|| Ok(())).unwrap();
        cancel.cancel();
        for _ in 0..3 {
            let cancel = cancel.clone();
            limiter.add(move || cancel.check()).unwrap();
        }
        let failures = limiter.stop_and_wait().unwrap();
        assert_eq!(failures.len(), 4);
        assert_eq!(failures.iter().filter(|e| e.is_cancelled()).count(), 3);
        assert_eq!(
            failures
                .iter()
                .filter(|e| matches!(e.kind(), ErrorKind::WorkUnitPanicked { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_stop_without_wait_drains() {
        let limiter =
            QueuedLimiter::with_options(LimiterOptions::new(2).intake_capacity(8)).unwrap();
        limiter.start().unwrap();
        for _ in 0..8 {
            limiter
                .add(|| {
                    jitter();
                    Err(Error::work_unit("late"))
                })
                .unwrap();
        }
        limiter.stop().unwrap();
        assert_ne!(limiter.state(), LimiterState::Started);
        assert!(limiter.failure_count() <= 8);
        assert_eq!(limiter.wait().unwrap().len(), 8);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_failures_returned_once() {
        let limiter = QueuedLimiter::new(2).unwrap();
        limiter.start().unwrap();
        limiter.add(|| Err(Error::work_unit("once"))).unwrap();
        assert_eq!(limiter.stop_and_wait().unwrap().len(), 1);

        let err = limiter.wait().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
        let err = limiter.stop_and_wait().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
        assert_eq!(limiter.state(), LimiterState::Quiesced);
    }

    #[test]
    fn test_concurrent_waits() {
        for _ in 0..20 {
            let limiter = QueuedLimiter::new(3).unwrap();
            limiter.start().unwrap();
            for i in 0..30 {
                limiter
                    .add(move || {
                        jitter();
                        Err(Error::work_unit(i.to_string()))
                    })
                    .unwrap();
            }
            limiter.stop().unwrap();

            let results = thread::scope(|s| {
                let waiters = (0..2).map(|_| s.spawn(|| limiter.wait())).collect::<Vec<_>>();
                waiters
                    .into_iter()
                    .map(|w| w.join().unwrap())
                    .collect::<Vec<_>>()
            });
            let (collected, rejected): (Vec<_>, Vec<_>) =
                results.into_iter().partition(|r| r.is_ok());
            assert_eq!(collected.len(), 1);
            assert_eq!(rejected.len(), 1);
            assert!(matches!(
                rejected[0].as_ref().unwrap_err().kind(),
                ErrorKind::InvalidOperation { .. }
            ));
            assert_eq!(collected[0].as_ref().unwrap().len(), 30);
            assert_eq!(limiter.in_flight(), 0);
        }
    }
}
