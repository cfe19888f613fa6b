// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Single-fire broadcast announcing that shutdown has begun.
///
/// All clones share the same underlying latch. Once triggered it never reopens,
/// and every current and future observer is released.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,

    /// Set by the first explicit [trigger](Self::trigger) call on this signal (or any of its clones).
    fired: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the latch and wake up all observers.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Returns true if the latch has been closed.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Obtain a future that resolves once the latch is closed.
    ///
    /// The future is owned, so it can be moved into spawned tasks and held across
    /// iterations of a `select!` loop. It resolves immediately if the signal has already fired.
    pub fn observe(&self) -> impl Future<Output = ()> + Send + 'static {
        self.token.clone().cancelled_owned()
    }
}
