// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use quiesce_task::{Worker, WorkerError};
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

/// Worker that holds no work of its own and merely takes its time to clean up once stopped.
pub struct IdleWorker {
    cleanup_delay: Duration,
}

impl IdleWorker {
    pub fn new(cleanup_delay: Duration) -> Self {
        IdleWorker { cleanup_delay }
    }
}

#[async_trait]
impl Worker for IdleWorker {
    async fn cleanup(&mut self) -> Result<(), WorkerError> {
        tokio::time::sleep(self.cleanup_delay).await;
        Ok(())
    }
}

/// Worker emitting a periodic heartbeat.
pub struct TickWorker {
    ticker: Interval,
    ticks: u64,
    cleanup_delay: Duration,
}

impl TickWorker {
    /// Must be called within a tokio runtime.
    pub fn new(period: Duration, cleanup_delay: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.reset();

        TickWorker {
            ticker,
            ticks: 0,
            cleanup_delay,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[async_trait]
impl Worker for TickWorker {
    async fn work(&mut self) -> Result<(), WorkerError> {
        self.ticker.tick().await;
        self.ticks += 1;
        debug!("heartbeat #{}", self.ticks);
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<(), WorkerError> {
        debug!("stopping after {} heartbeats", self.ticks);
        tokio::time::sleep(self.cleanup_delay).await;
        Ok(())
    }
}
