// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use quiesce_node::config::Config;
use quiesce_node::error::QuiesceNodeError;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args, Debug)]
pub(crate) struct Args {
    /// Path to the file the default configuration should be written to
    #[clap(long, default_value = "quiesce.toml")]
    pub(crate) output: PathBuf,

    /// Overwrite the file if it already exists
    #[clap(long)]
    pub(crate) force: bool,
}

pub(crate) fn execute(args: Args) -> Result<(), QuiesceNodeError> {
    if args.output.exists() && !args.force {
        return Err(QuiesceNodeError::ConfigAlreadyExists { path: args.output });
    }

    Config::default().save_to_toml_file(&args.output)?;
    info!("saved the default config to '{}'", args.output.display());
    Ok(())
}
