use std::num::NonZeroUsize;

/// Immutable execution bounds for a worker instance.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    worker_id: usize,
    max_iterations: NonZeroUsize,
}

impl WorkerConfig {
    /// Creates a new worker configuration.
    ///
    /// # Args
    /// * `worker_id` - Identifier used for reports and observability.
    /// * `max_iterations` - Number of round trips against the parameter server.
    ///
    /// # Returns
    /// A `WorkerConfig` instance.
    pub fn new(worker_id: usize, max_iterations: NonZeroUsize) -> Self {
        Self {
            worker_id,
            max_iterations,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Returns the total number of round trips.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations.get()
    }
}
