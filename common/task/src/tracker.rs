// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;
use thiserror::Error;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::trace;

#[derive(Debug, Error)]
#[error("{outstanding} registered worker(s) did not report completion within {limit:?}")]
pub struct JoinTimeout {
    pub outstanding: usize,
    pub limit: Duration,
}

/// Countdown join barrier that lets the shutdown initiator wait until
/// every registered worker has acknowledged its exit.
///
/// Registrations are represented by [CompletionGuard]s. A guard decrements the count
/// exactly once, either through [done](CompletionGuard::done) or when it is dropped,
/// so it is impossible to report completion more times than was registered.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    inner: TaskTracker,
}

/// A single outstanding registration on a [CompletionTracker].
#[derive(Debug)]
#[must_use = "dropping the guard immediately counts the registration as completed"]
pub struct CompletionGuard {
    _token: TaskTrackerToken,
}

impl CompletionGuard {
    /// Report completion of the associated worker.
    pub fn done(self) {
        trace!("completion reported");
    }
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increase the outstanding count by `n`.
    ///
    /// The count is raised before this call returns, i.e. before any of the guards
    /// could be handed over to (and released by) a worker.
    pub fn register(&self, n: usize) -> Vec<CompletionGuard> {
        (0..n).map(|_| self.register_one()).collect()
    }

    pub fn register_one(&self) -> CompletionGuard {
        CompletionGuard {
            _token: self.inner.token(),
        }
    }

    /// Number of registrations that have not yet reported completion.
    pub fn outstanding(&self) -> usize {
        self.inner.len()
    }

    /// Wait until every registration has reported completion.
    ///
    /// There is no upper bound on the wait: a worker that never reports back keeps this
    /// future pending forever. Use [join_timeout](Self::join_timeout) for a bounded variant.
    pub async fn join(&self) {
        self.inner.close();
        self.inner.wait().await;
    }

    /// Like [join](Self::join), but gives up after `limit`.
    pub async fn join_timeout(&self, limit: Duration) -> Result<(), JoinTimeout> {
        tokio::time::timeout(limit, self.join())
            .await
            .map_err(|_| JoinTimeout {
                outstanding: self.outstanding(),
                limit,
            })
    }
}
