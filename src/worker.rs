//! Bounded worker pool for outbound attempts

use crate::error::DispatchError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

/// Ceiling on in-flight requests for a single dispatch.
pub const MAX_CONCURRENT_REQUESTS: usize = 10;

/// Worker pool for one dispatch
///
/// Created fresh per dispatch and consumed by [`WorkerPool::drain`].
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            tasks: JoinSet::new(),
        }
    }

    /// Submit a job, waiting for a free slot first
    ///
    /// The permit is acquired BEFORE spawning, so submission stalls while all
    /// slots are busy. This is the backpressure that keeps at most `size`
    /// jobs running no matter how many are queued behind them.
    pub async fn submit<F>(&mut self, job: F) -> Result<(), DispatchError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::PoolClosed)?;

        // Reap finished tasks so large bursts don't accumulate join results
        while let Some(result) = self.tasks.try_join_next() {
            log_join_failure(result);
        }

        self.tasks.spawn(async move {
            // Permit is held by this task and dropped when it completes
            let _permit = permit;
            job.await;
        });

        Ok(())
    }

    /// Wait for every submitted job to finish.
    pub async fn drain(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join_failure(result);
        }
    }
}

fn log_join_failure(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Worker task failed");
    }
}
