/// Options shared by producers and stage operators.
///
/// Every stage runs on its own thread and writes into a Stream created with these
/// options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    capacity: usize,
    thread_name: String,
}

impl StreamOptions {
    /// Stage outputs are unbuffered by default: a write completes only when the next
    /// stage has taken the value.
    pub const DEFAULT_CAPACITY: usize = 0;

    /// Prefix of stage thread names; the stage kind is appended.
    pub const DEFAULT_THREAD_NAME: &'static str = "conflux-stage";

    pub fn new() -> StreamOptions {
        StreamOptions {
            capacity: Self::DEFAULT_CAPACITY,
            thread_name: Self::DEFAULT_THREAD_NAME.to_string(),
        }
    }

    /// Number of values a stage may write ahead of its consumer. Zero (the default)
    /// makes every write a rendezvous.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the prefix of stage thread names. An empty prefix leaves the threads
    /// unnamed.
    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn get_capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_thread_name(&self) -> &str {
        &self.thread_name
    }

    pub(crate) fn stage_thread_name(&self, stage: &str) -> Option<String> {
        if self.thread_name.is_empty() {
            None
        } else {
            Some(format!("{}-{}", self.thread_name, stage))
        }
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions::new()
    }
}
