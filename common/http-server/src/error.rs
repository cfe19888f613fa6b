// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpServerError {
    #[error("failed to bind the http server to {address}: {source}")]
    SocketBindFailure {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
