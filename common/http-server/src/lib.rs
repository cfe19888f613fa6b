// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use quiesce_task::{Drain, DrainOutcome};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

pub use error::HttpServerError;

pub mod error;

// back-off applied after a failed `accept`, e.g. when we run out of file descriptors
const ACCEPT_FAILURE_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    Listening,
    Draining,
    Closed,
}

/// HTTP/1 server whose shutdown is split into two stages: connections are first asked
/// to finish their current request and close, and only once the grace period expires
/// are the remaining ones closed forcibly.
///
/// Upgraded connections (e.g. websockets) are not tracked beyond the upgrade
/// and have to be closed by whoever took them over.
pub struct DrainableServer {
    bind_address: SocketAddr,
    router: Router,
}

impl DrainableServer {
    pub fn new(bind_address: SocketAddr, router: Router) -> Self {
        DrainableServer {
            bind_address,
            router,
        }
    }

    /// Bind the listener and start accepting connections in the background.
    pub async fn start(self) -> Result<RunningServer, HttpServerError> {
        let address = self.bind_address;
        info!("starting the http server on http://{address}");

        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| HttpServerError::SocketBindFailure { address, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| HttpServerError::SocketBindFailure { address, source })?;

        let control = ConnectionControl {
            connections: TaskTracker::new(),
            draining: CancellationToken::new(),
            force_close: CancellationToken::new(),
        };
        let stop_accepting = CancellationToken::new();

        let accept_loop = tokio::spawn(accept_connections(
            listener,
            self.router,
            control.clone(),
            stop_accepting.clone(),
        ));

        Ok(RunningServer {
            local_addr,
            state: watch::Sender::new(ServerState::Listening),
            stop_accepting,
            control,
            accept_loop,
        })
    }
}

#[derive(Clone)]
struct ConnectionControl {
    /// Every spawned connection task.
    connections: TaskTracker,

    /// Asks connections to finish their in-flight request and close.
    draining: CancellationToken,

    /// Drops whatever connections are still open.
    force_close: CancellationToken,
}

async fn accept_connections(
    listener: TcpListener,
    router: Router,
    control: ConnectionControl,
    stop_accepting: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop_accepting.cancelled() => {
                debug!("no longer accepting new connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    debug!("accepted connection from {remote}");
                    control.connections.spawn(serve_connection(
                        stream,
                        remote,
                        router.clone(),
                        control.draining.clone(),
                        control.force_close.clone(),
                    ));
                }
                Err(err) => {
                    warn!("failed to accept incoming connection: {err}");
                    tokio::time::sleep(ACCEPT_FAILURE_BACKOFF).await;
                }
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    router: Router,
    draining: CancellationToken,
    force_close: CancellationToken,
) {
    let connection = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(router));
    tokio::pin!(connection);

    let res = tokio::select! {
        res = connection.as_mut() => res,
        _ = draining.cancelled() => {
            connection.as_mut().graceful_shutdown();
            tokio::select! {
                res = connection.as_mut() => res,
                _ = force_close.cancelled() => {
                    debug!("forcibly closing connection from {remote}");
                    return;
                }
            }
        }
    };

    if let Err(err) = res {
        debug!("failed to serve connection from {remote}: {err}");
    }
}

pub struct RunningServer {
    local_addr: SocketAddr,
    state: watch::Sender<ServerState>,
    stop_accepting: CancellationToken,
    control: ConnectionControl,
    accept_loop: JoinHandle<()>,
}

impl RunningServer {
    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn active_connections(&self) -> usize {
        self.control.connections.len()
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn state_watcher(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Stop accepting, give in-flight requests up to `grace` to complete,
    /// then close every connection that is still open.
    pub async fn shutdown(mut self, grace: Duration) -> DrainOutcome {
        self.state.send_replace(ServerState::Draining);

        self.stop_accepting.cancel();
        if let Err(err) = (&mut self.accept_loop).await {
            warn!("the accept loop has not finished cleanly: {err}");
        }

        let connections = &self.control.connections;
        info!(
            "listener closed. waiting for {} active connection(s) to finish",
            connections.len()
        );
        connections.close();
        self.control.draining.cancel();

        let outcome = match tokio::time::timeout(grace, connections.wait()).await {
            Ok(_) => DrainOutcome::Graceful,
            Err(_) => {
                let remaining = connections.len();
                warn!("{remaining} connection(s) did not finish within {grace:?}. closing them");
                self.control.force_close.cancel();
                connections.wait().await;
                DrainOutcome::Forced { remaining }
            }
        };

        self.state.send_replace(ServerState::Closed);
        outcome
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.stop_accepting.cancel();
        self.control.draining.cancel();
        self.control.force_close.cancel();
    }
}

#[async_trait]
impl Drain for RunningServer {
    async fn drain(self: Box<Self>, grace: Duration) -> DrainOutcome {
        self.shutdown(grace).await
    }
}
