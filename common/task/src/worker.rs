// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::stop::StopSignal;
use crate::tracker::CompletionGuard;
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub usize);

impl Display for WorkerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("work iteration failed: {message}")]
    Work { message: String },

    #[error("cleanup failed: {message}")]
    Cleanup { message: String },

    #[error("cleanup did not finish within {limit:?}")]
    CleanupTimeout { limit: Duration },
}

impl WorkerError {
    pub fn work<S: Into<String>>(message: S) -> Self {
        WorkerError::Work {
            message: message.into(),
        }
    }

    pub fn cleanup<S: Into<String>>(message: S) -> Self {
        WorkerError::Cleanup {
            message: message.into(),
        }
    }
}

/// A long-running background service that is only ever stopped through a [StopSignal].
#[async_trait]
pub trait Worker: Send + 'static {
    /// Perform a single unit of work.
    ///
    /// The future is dropped as soon as the stop signal fires, so it must be cancellation safe.
    /// The default implementation never completes, i.e. the worker just idles until stopped.
    async fn work(&mut self) -> Result<(), WorkerError> {
        futures::future::pending().await
    }

    /// Release whatever the worker holds. Must be bounded in time.
    async fn cleanup(&mut self) -> Result<(), WorkerError> {
        Ok(())
    }
}

/// Handle to a spawned worker task.
#[derive(Debug)]
pub struct WorkerHandle {
    id: WorkerId,
    state: watch::Receiver<WorkerState>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Wait until the worker reaches (at least) the provided state.
    /// Returns `false` if the worker task went away before getting there, e.g. it panicked.
    pub async fn wait_for_state(&mut self, target: WorkerState) -> bool {
        self.state.wait_for(|state| *state >= target).await.is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the provided worker on the current runtime.
///
/// The worker runs until `stop` fires, then performs its cleanup (bounded by `cleanup_limit`, if set)
/// and finally reports completion through `guard`. The guard is owned by the spawned task,
/// so completion is reported on every exit path, including panics.
#[track_caller]
pub fn spawn_worker<W>(
    id: WorkerId,
    mut worker: W,
    stop: StopSignal,
    guard: CompletionGuard,
    cleanup_limit: Option<Duration>,
) -> WorkerHandle
where
    W: Worker,
{
    let (state_tx, state_rx) = watch::channel(WorkerState::Starting);

    let task = tokio::spawn(async move {
        let guard = guard;

        info!("starting {id}");
        state_tx.send_replace(WorkerState::Running);

        let stopped = stop.observe();
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => {
                    debug!("{id}: received stop signal");
                    break;
                }
                res = worker.work() => {
                    if let Err(err) = res {
                        warn!("{id}: {err}");
                    }
                }
            }
        }

        state_tx.send_replace(WorkerState::Stopping);
        info!("exiting {id}");

        let cleanup_result = match cleanup_limit {
            Some(limit) => tokio::time::timeout(limit, worker.cleanup())
                .await
                .unwrap_or(Err(WorkerError::CleanupTimeout { limit })),
            None => worker.cleanup().await,
        };
        if let Err(err) = cleanup_result {
            warn!("{id} did not clean up properly: {err}");
        }

        state_tx.send_replace(WorkerState::Stopped);
        guard.done();
    });

    WorkerHandle {
        id,
        state: state_rx,
        task,
    }
}
