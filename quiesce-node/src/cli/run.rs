// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::env::vars::*;
use quiesce_bin_common::logging::maybe_print_banner;
use quiesce_node::config::{Config, ShutdownTrigger};
use quiesce_node::error::QuiesceNodeError;
use quiesce_node::QuiesceNode;
use quiesce_task::JoinOutcome;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

#[derive(clap::Args, Debug)]
pub(crate) struct Args {
    /// Flag used for disabling the printed banner in tty.
    #[clap(long, env = QUIESCE_NO_BANNER_ARG)]
    pub(crate) no_banner: bool,

    /// Path to the TOML config file. If not provided, the defaults are used.
    #[clap(long, env = QUIESCE_CONFIG_ARG)]
    pub(crate) config: Option<PathBuf>,

    /// Number of background workers to spawn
    #[clap(long, env = QUIESCE_WORKERS_ARG)]
    pub(crate) workers: Option<usize>,

    /// Time each worker spends on its cleanup after being told to stop
    #[clap(
        long,
        env = QUIESCE_CLEANUP_DELAY_ARG,
        value_parser = humantime::parse_duration
    )]
    pub(crate) cleanup_delay: Option<Duration>,

    /// Time given to in-flight http requests to complete during the shutdown
    #[clap(
        long,
        env = QUIESCE_GRACE_PERIOD_ARG,
        value_parser = humantime::parse_duration
    )]
    pub(crate) grace_period: Option<Duration>,

    /// Shut down on a timer rather than waiting for a termination signal
    #[clap(
        long,
        env = QUIESCE_SHUTDOWN_AFTER_ARG,
        value_parser = humantime::parse_duration
    )]
    pub(crate) shutdown_after: Option<Duration>,

    /// Address the http listener should bind to
    #[clap(long, env = QUIESCE_HTTP_BIND_ARG)]
    pub(crate) http_bind: Option<SocketAddr>,

    /// Do not start the http listener
    #[clap(long, env = QUIESCE_NO_HTTP_ARG, conflicts_with = "http_bind")]
    pub(crate) no_http: bool,
}

impl Args {
    /// Load the config file (if any) and apply the command line overrides on top of it.
    pub(crate) fn build_config(&self) -> Result<Config, QuiesceNodeError> {
        let mut config = match &self.config {
            Some(path) => Config::read_from_toml_file(path)?,
            None => Config::default(),
        };

        if let Some(workers) = self.workers {
            config.workers.count = workers;
        }
        if let Some(cleanup_delay) = self.cleanup_delay {
            config.workers.cleanup_delay = cleanup_delay;
        }
        if let Some(grace_period) = self.grace_period {
            config.shutdown.grace_period = grace_period;
        }
        if let Some(after) = self.shutdown_after {
            config.shutdown.trigger = ShutdownTrigger::Timer;
            config.shutdown.timer = after;
        }
        if let Some(bind_address) = self.http_bind {
            config.http.bind_address = bind_address;
        }
        if self.no_http {
            config.http.enabled = false;
        }

        Ok(config)
    }
}

pub(crate) async fn execute(args: Args) -> Result<ExitCode, QuiesceNodeError> {
    if !args.no_banner {
        maybe_print_banner(clap::crate_name!(), clap::crate_version!());
    }

    let config = args.build_config()?;
    let node = QuiesceNode::new(config).start().await?;
    if let Some(address) = node.http_address() {
        info!("http listener available at http://{address}");
    }

    let report = node.wait().await;
    info!(
        "shutdown triggered by {} completed in {}",
        report.trigger,
        humantime::format_duration(report.elapsed)
    );

    if let JoinOutcome::TimedOut { outstanding } = report.join {
        error!("{outstanding} worker(s) failed to stop in time");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::io::Write;

    fn run_args(args: &[&str]) -> Args {
        let cli = Cli::try_parse_from(["quiesce-node", "run"].iter().chain(args)).unwrap();
        match cli.command {
            Commands::Run(args) => args,
            Commands::Init(_) => panic!("unexpected command"),
        }
    }

    #[test]
    fn no_arguments_yield_the_default_config() {
        let config = run_args(&[]).build_config().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn command_line_overrides_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [workers]
            count = 2
            cleanup_delay = "3s"

            [shutdown]
            grace_period = "10s"
            "#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = run_args(&[
            "--config",
            path,
            "--workers",
            "7",
            "--shutdown-after",
            "2s",
            "--no-http",
        ])
        .build_config()
        .unwrap();

        assert_eq!(config.workers.count, 7);
        assert_eq!(config.workers.cleanup_delay, Duration::from_secs(3));
        assert_eq!(config.shutdown.grace_period, Duration::from_secs(10));
        assert_eq!(config.shutdown.trigger, ShutdownTrigger::Timer);
        assert_eq!(config.shutdown.timer, Duration::from_secs(2));
        assert!(!config.http.enabled);
    }

    #[test]
    fn invalid_durations_are_rejected() {
        let res = Cli::try_parse_from(["quiesce-node", "run", "--grace-period", "soon"]);
        assert!(res.is_err());
    }
}
