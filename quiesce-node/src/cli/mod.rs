// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, Subcommand};
use quiesce_node::error::QuiesceNodeError;
use std::process::ExitCode;

pub(crate) mod env;
mod init;
mod run;

#[derive(Parser, Debug)]
#[clap(author = "Nymtech", version, about)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

impl Cli {
    pub(crate) async fn execute(self) -> Result<ExitCode, QuiesceNodeError> {
        match self.command {
            Commands::Run(args) => run::execute(args).await,
            Commands::Init(args) => init::execute(args).map(|_| ExitCode::SUCCESS),
        }
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Start the workers and the http listener and run until the shutdown is triggered
    Run(run::Args),

    /// Write the default configuration to a file
    Init(init::Args),
}
