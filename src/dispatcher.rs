//! Background fan-out of GET requests to a single target
//!
//! A dispatch is launched as a detached tokio task. The caller gets a handle
//! back immediately and is free to drop it; the attempts keep running on
//! their own schedule, bounded by a per-dispatch [`WorkerPool`].

use crate::error::{AttemptError, DispatchError};
use crate::transport::Transport;
use crate::worker::{WorkerPool, MAX_CONCURRENT_REQUESTS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// One burst of requests, built per trigger and owned by its dispatch task
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    dispatch_id: Uuid,
    target_url: String,
    count: u64,
    per_request_timeout: Duration,
}

impl DispatchRequest {
    pub fn new(target_url: String, count: u64, per_request_timeout: Duration) -> Self {
        Self {
            dispatch_id: Uuid::new_v4(),
            target_url,
            count,
            per_request_timeout,
        }
    }

    pub fn dispatch_id(&self) -> Uuid {
        self.dispatch_id
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn per_request_timeout(&self) -> Duration {
        self.per_request_timeout
    }
}

/// Result of a single attempt. Only ever logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success { status: u16 },
    Failure { error: AttemptError },
}

impl RequestOutcome {
    fn log(&self, dispatch_id: Uuid, url: &str) {
        match self {
            RequestOutcome::Success { status } => {
                info!(dispatch_id = %dispatch_id, url = %url, status_code = status, "Visited target");
            }
            RequestOutcome::Failure { error } => {
                warn!(dispatch_id = %dispatch_id, url = %url, error = %error, "Error while visiting target");
            }
        }
    }
}

/// What a finished dispatch reports to the log
#[derive(Debug)]
pub struct DispatchSummary {
    pub dispatch_id: Uuid,
    pub target_url: String,
    pub attempts: u64,
    pub elapsed: Duration,
}

/// Handle to a launched dispatch. Dropping it detaches the dispatch.
pub struct DispatchHandle {
    dispatch_id: Uuid,
    join: JoinHandle<DispatchSummary>,
}

impl DispatchHandle {
    pub fn dispatch_id(&self) -> Uuid {
        self.dispatch_id
    }

    /// Wait for the dispatch to drain. The trigger path never calls this.
    pub async fn join(self) -> Result<DispatchSummary, tokio::task::JoinError> {
        self.join.await
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Launch a dispatch without waiting on any of its attempts
    ///
    /// # Returns
    /// * `Ok(DispatchHandle)` - The dispatch is running in the background
    /// * `Err(DispatchError::NoRuntime)` - Called outside a tokio runtime
    pub fn dispatch(&self, request: DispatchRequest) -> Result<DispatchHandle, DispatchError> {
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let dispatch_id = request.dispatch_id;
        let join = runtime.spawn(run_dispatch(self.transport.clone(), request));

        Ok(DispatchHandle { dispatch_id, join })
    }
}

async fn run_dispatch(transport: Arc<dyn Transport>, request: DispatchRequest) -> DispatchSummary {
    let started = Instant::now();
    let request = Arc::new(request);
    let mut pool = WorkerPool::new(MAX_CONCURRENT_REQUESTS);
    let mut attempts = 0;

    for _ in 0..request.count {
        let transport = transport.clone();
        let shared = request.clone();

        let job = async move {
            let outcome = attempt(
                transport.as_ref(),
                &shared.target_url,
                shared.per_request_timeout,
            )
            .await;
            outcome.log(shared.dispatch_id, &shared.target_url);
        };

        if let Err(e) = pool.submit(job).await {
            error!(dispatch_id = %request.dispatch_id, error = %e, "Stopped submitting attempts");
            break;
        }
        attempts += 1;
    }

    // The summary is only logged once every attempt has actually finished
    pool.drain().await;

    let summary = DispatchSummary {
        dispatch_id: request.dispatch_id,
        target_url: request.target_url.clone(),
        attempts,
        elapsed: started.elapsed(),
    };

    info!(
        dispatch_id = %summary.dispatch_id,
        url = %summary.target_url,
        attempts = summary.attempts,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Finished sending background requests"
    );

    summary
}

/// Perform one GET, bounded by `timeout` even if the transport ignores it.
pub async fn attempt(transport: &dyn Transport, url: &str, timeout: Duration) -> RequestOutcome {
    match tokio::time::timeout(timeout, transport.get(url, timeout)).await {
        Ok(Ok(status)) => RequestOutcome::Success { status },
        Ok(Err(error)) => RequestOutcome::Failure { error },
        Err(_) => RequestOutcome::Failure {
            error: AttemptError::Timeout(timeout),
        },
    }
}
