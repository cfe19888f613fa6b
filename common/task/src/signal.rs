// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationRequest {
    Interrupt,
    Terminate,
    Quit,
}

impl Display for TerminationRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationRequest::Interrupt => write!(f, "SIGINT"),
            TerminationRequest::Terminate => write!(f, "SIGTERM"),
            TerminationRequest::Quit => write!(f, "SIGQUIT"),
        }
    }
}

/// Adapter turning process-level termination requests into at most one shutdown trigger.
///
/// The first request is delivered through [recv](Self::recv). Every later request
/// is logged and dropped, it never terminates the process.
#[derive(Debug)]
pub struct ExternalSignalSource {
    requests: mpsc::Receiver<TerminationRequest>,
}

impl ExternalSignalSource {
    /// Subscribe to SIGINT and SIGTERM.
    pub fn install() -> std::io::Result<Self> {
        Self::install_with(&[TerminationRequest::Interrupt, TerminationRequest::Terminate])
    }

    /// Subscribe to the provided set of termination requests.
    ///
    /// Subscriptions are registered before this returns. Must be called within a tokio runtime.
    pub fn install_with(kinds: &[TerminationRequest]) -> std::io::Result<Self> {
        let mut streams = Vec::with_capacity(kinds.len());
        for kind in kinds {
            streams.push(os_signal_stream(*kind)?);
        }
        Ok(Self::from_stream(futures::stream::select_all(streams)))
    }

    /// Build the source on top of an arbitrary stream of requests.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = TerminationRequest> + Send + 'static,
    {
        let (tx, requests) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            while let Some(request) = stream.next().await {
                match tx.try_send(request) {
                    Ok(_) => info!("received {request}"),
                    Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                        warn!("received {request} while shutdown is already pending - ignoring it")
                    }
                }
            }
            debug!("termination request stream has finished");
        });

        ExternalSignalSource { requests }
    }

    /// Wait for the first termination request.
    ///
    /// Returns `None` if the underlying stream ended without producing anything.
    pub async fn recv(mut self) -> Option<TerminationRequest> {
        self.requests.recv().await
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn os_signal_stream(
            kind: TerminationRequest,
        ) -> std::io::Result<BoxStream<'static, TerminationRequest>> {
            use tokio::signal::unix::{signal, SignalKind};
            use tokio_stream::wrappers::SignalStream;

            let signal_kind = match kind {
                TerminationRequest::Interrupt => SignalKind::interrupt(),
                TerminationRequest::Terminate => SignalKind::terminate(),
                TerminationRequest::Quit => SignalKind::quit(),
            };
            let stream = SignalStream::new(signal(signal_kind)?);
            Ok(stream.map(move |_| kind).boxed())
        }
    } else {
        fn os_signal_stream(
            kind: TerminationRequest,
        ) -> std::io::Result<BoxStream<'static, TerminationRequest>> {
            // only ctrl-c is available on this platform
            if kind != TerminationRequest::Interrupt {
                return Ok(futures::stream::pending().boxed());
            }
            let stream = futures::stream::unfold((), |_| async {
                tokio::signal::ctrl_c()
                    .await
                    .ok()
                    .map(|_| (TerminationRequest::Interrupt, ()))
            });
            Ok(stream.boxed())
        }
    }
}
