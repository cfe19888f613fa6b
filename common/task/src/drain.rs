// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight activity finished within the grace period.
    Graceful,

    /// The grace period expired and the remaining activities had to be forcibly terminated.
    Forced { remaining: usize },
}

impl DrainOutcome {
    pub fn is_graceful(&self) -> bool {
        matches!(self, DrainOutcome::Graceful)
    }
}

/// Final, bounded shutdown step of an externally reachable component, such as a network listener.
///
/// It is only ever invoked once all registered workers have reported completion.
#[async_trait]
pub trait Drain: Send + Sync {
    /// Stop accepting new work, let in-flight work finish for up to `grace`,
    /// then terminate whatever is left.
    async fn drain(self: Box<Self>, grace: Duration) -> DrainOutcome;
}
