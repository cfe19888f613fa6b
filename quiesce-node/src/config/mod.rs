// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::QuiesceNodeError;
use quiesce_task::CoordinatorSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HTTP_PORT: u16 = 3000;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub workers: WorkersConfig,

    #[serde(default)]
    pub shutdown: ShutdownConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    pub fn read_from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, QuiesceNodeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| {
            QuiesceNodeError::ConfigLoadFailure {
                path: path.to_path_buf(),
                source,
            }
        })?;
        toml::from_str(&raw).map_err(|source| QuiesceNodeError::ConfigParseFailure {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), QuiesceNodeError> {
        let path = path.as_ref();
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized).map_err(|source| QuiesceNodeError::ConfigSaveFailure {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            grace_period: self.shutdown.grace_period,
            cleanup_limit: self.shutdown.cleanup_limit,
            join_timeout: self.shutdown.join_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Does nothing until told to stop.
    Idle,

    /// Emits a periodic heartbeat.
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkersConfig {
    /// Number of background workers to spawn.
    pub count: usize,

    /// Time each worker spends on its cleanup after being told to stop.
    #[serde(with = "humantime_serde")]
    pub cleanup_delay: Duration,

    pub kind: WorkerKind,

    /// Heartbeat period of `tick` workers.
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
}

impl WorkersConfig {
    pub const DEFAULT_COUNT: usize = 5;
    pub const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);
}

impl Default for WorkersConfig {
    fn default() -> Self {
        WorkersConfig {
            count: Self::DEFAULT_COUNT,
            cleanup_delay: Self::DEFAULT_CLEANUP_DELAY,
            kind: WorkerKind::Idle,
            tick_interval: Self::DEFAULT_TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownTrigger {
    /// Wait for SIGINT or SIGTERM.
    Signal,

    /// Shut down on its own once `shutdown.timer` has passed.
    Timer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    /// Time given to in-flight HTTP requests to complete once every worker has stopped.
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,

    pub trigger: ShutdownTrigger,

    /// Used when `trigger = "timer"`.
    #[serde(with = "humantime_serde")]
    pub timer: Duration,

    /// Optional upper bound on waiting for all the workers.
    #[serde(
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub join_timeout: Option<Duration>,

    /// Optional upper bound on a single worker's cleanup.
    #[serde(
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub cleanup_limit: Option<Duration>,
}

impl ShutdownConfig {
    pub const DEFAULT_GRACE_PERIOD: Duration = quiesce_task::coordinator::DEFAULT_GRACE_PERIOD;
    pub const DEFAULT_TIMER: Duration = Duration::from_secs(5);
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        ShutdownConfig {
            grace_period: Self::DEFAULT_GRACE_PERIOD,
            trigger: ShutdownTrigger::Signal,
            timer: Self::DEFAULT_TIMER,
            join_timeout: None,
            cleanup_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub enabled: bool,

    pub bind_address: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            enabled: true,
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_HTTP_PORT),
        }
    }
}
