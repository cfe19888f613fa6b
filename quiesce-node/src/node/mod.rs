// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Config, ShutdownTrigger, WorkerKind};
use crate::error::QuiesceNodeError;
use crate::node::workers::{IdleWorker, TickWorker};
use quiesce_http_server::DrainableServer;
use quiesce_task::{ShutdownCoordinator, ShutdownHandle, ShutdownReport};
use std::net::SocketAddr;
use tracing::info;

pub(crate) mod http;
pub mod workers;

pub struct QuiesceNode {
    config: Config,
}

impl QuiesceNode {
    pub fn new(config: Config) -> Self {
        QuiesceNode { config }
    }

    /// Register the shutdown triggers, bind the http listener and spawn all the workers.
    ///
    /// Everything that could fail happens before the first worker is started.
    pub async fn start(self) -> Result<StartedNode, QuiesceNodeError> {
        let config = self.config;
        let mut coordinator = ShutdownCoordinator::new(config.coordinator_settings());

        coordinator = match config.shutdown.trigger {
            ShutdownTrigger::Signal => {
                info!("waiting for signal...");
                coordinator
                    .with_default_signals()
                    .map_err(|source| QuiesceNodeError::SignalRegistrationFailure { source })?
            }
            ShutdownTrigger::Timer => {
                let after = config.shutdown.timer;
                info!("shutting down in {}", humantime::format_duration(after));
                coordinator.with_timer(after)
            }
        };

        let mut http_address = None;
        if config.http.enabled {
            let server = DrainableServer::new(config.http.bind_address, http::build_router())
                .start()
                .await?;
            http_address = Some(server.local_addr());
            coordinator = coordinator.with_drain(Box::new(server));
        }

        let workers = &config.workers;
        for _ in 0..workers.count {
            match workers.kind {
                WorkerKind::Idle => {
                    coordinator.spawn_worker(IdleWorker::new(workers.cleanup_delay));
                }
                WorkerKind::Tick => {
                    coordinator.spawn_worker(TickWorker::new(
                        workers.tick_interval,
                        workers.cleanup_delay,
                    ));
                }
            }
        }

        Ok(StartedNode {
            handle: coordinator.handle(),
            coordinator,
            http_address,
        })
    }
}

pub struct StartedNode {
    coordinator: ShutdownCoordinator,
    handle: ShutdownHandle,
    http_address: Option<SocketAddr>,
}

impl StartedNode {
    /// Address of the http listener, if it has been enabled.
    pub fn http_address(&self) -> Option<SocketAddr> {
        self.http_address
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// Block until the shutdown has been triggered and fully performed.
    pub async fn wait(self) -> ShutdownReport {
        self.coordinator.run_until_shutdown().await
    }
}
