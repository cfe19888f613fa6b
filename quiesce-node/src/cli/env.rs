// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod vars {
    pub(crate) const QUIESCE_NO_BANNER_ARG: &str = "QUIESCE_NO_BANNER";
    pub(crate) const QUIESCE_CONFIG_ARG: &str = "QUIESCE_CONFIG";
    pub(crate) const QUIESCE_WORKERS_ARG: &str = "QUIESCE_WORKERS";
    pub(crate) const QUIESCE_CLEANUP_DELAY_ARG: &str = "QUIESCE_CLEANUP_DELAY";
    pub(crate) const QUIESCE_GRACE_PERIOD_ARG: &str = "QUIESCE_GRACE_PERIOD";
    pub(crate) const QUIESCE_SHUTDOWN_AFTER_ARG: &str = "QUIESCE_SHUTDOWN_AFTER";
    pub(crate) const QUIESCE_HTTP_BIND_ARG: &str = "QUIESCE_HTTP_BIND";
    pub(crate) const QUIESCE_NO_HTTP_ARG: &str = "QUIESCE_NO_HTTP";
}
