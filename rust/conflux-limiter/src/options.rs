use conflux_common::{Result, verify_arg};
use conflux_workflow::thread_pool::ThreadPool;

/// Options for creating a [`WorkLimiter`] or a [`QueuedLimiter`].
///
/// [`WorkLimiter`]: crate::bounded::WorkLimiter
/// [`QueuedLimiter`]: crate::queued::QueuedLimiter
#[derive(Debug, Clone)]
pub struct LimiterOptions {
    max_concurrency: usize,
    pool: Option<ThreadPool>,
    thread_name: String,
    intake_capacity: usize,
}

impl LimiterOptions {
    /// Prefix for the names of the threads a limiter creates.
    pub const DEFAULT_THREAD_NAME: &'static str = "conflux-limiter";

    /// The queued intake is unbuffered by default: `add` returns once the dispatcher
    /// has taken the unit.
    pub const DEFAULT_INTAKE_CAPACITY: usize = 0;

    /// Creates options allowing at most `max_concurrency` work units to run at once.
    ///
    /// The value is validated when the limiter is created; it must be at least 1.
    pub fn new(max_concurrency: usize) -> LimiterOptions {
        LimiterOptions {
            max_concurrency,
            pool: None,
            thread_name: Self::DEFAULT_THREAD_NAME.to_string(),
            intake_capacity: Self::DEFAULT_INTAKE_CAPACITY,
        }
    }

    /// Runs work units on `pool` instead of a dedicated pool of `max_concurrency`
    /// threads. A pool smaller than `max_concurrency` lowers the effective
    /// concurrency; it never raises it.
    pub fn pool(mut self, pool: ThreadPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Number of submitted units the queued intake buffers ahead of the dispatcher.
    pub fn intake_capacity(mut self, intake_capacity: usize) -> Self {
        self.intake_capacity = intake_capacity;
        self
    }

    pub fn get_max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn get_intake_capacity(&self) -> usize {
        self.intake_capacity
    }

    pub fn get_thread_name(&self) -> &str {
        &self.thread_name
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(max_concurrency, self.max_concurrency >= 1);
        Ok(())
    }

    /// The configured pool, or a new one with a worker per concurrency slot.
    pub(crate) fn build_pool(&self) -> ThreadPool {
        match &self.pool {
            Some(pool) => pool.clone(),
            None => {
                let prefix = self.thread_name.clone();
                ThreadPool::with_thread_name(self.max_concurrency, move |i| {
                    if prefix.is_empty() {
                        String::new()
                    } else {
                        format!("{prefix}-{i}")
                    }
                })
            }
        }
    }
}
