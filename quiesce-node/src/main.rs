// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::Cli;
use clap::Parser;
use quiesce_bin_common::logging::setup_tracing_logger;
use std::process::ExitCode;
use tracing::{error, trace};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = setup_tracing_logger() {
        eprintln!("failed to initialise the logger: {err}");
    }
    trace!("args: {cli:#?}");

    match cli.execute().await {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
