// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use quiesce_http_server::HttpServerError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuiesceNodeError {
    #[error("failed to load config file using path '{}'. detailed message: {source}", path.display())]
    ConfigLoadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file at '{}'. detailed message: {source}", path.display())]
    ConfigParseFailure {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize the config: {source}")]
    ConfigSerializationFailure {
        #[from]
        source: toml::ser::Error,
    },

    #[error("failed to save config file using path '{}'. detailed message: {source}", path.display())]
    ConfigSaveFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file already exists at '{}'. use --force to overwrite it", path.display())]
    ConfigAlreadyExists { path: PathBuf },

    #[error("failed to register the termination signal handlers: {source}")]
    SignalRegistrationFailure {
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    HttpFailure(#[from] HttpServerError),
}
