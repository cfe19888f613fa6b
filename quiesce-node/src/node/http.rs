// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use axum::extract::Path;
use axum::routing::get;
use axum::Router;
use std::time::Duration;

// requests asking for longer than that are clamped
const MAX_SLOW_REQUEST: Duration = Duration::from_secs(60);

pub(crate) fn build_router() -> Router {
    Router::new()
        .route("/test", get(test))
        .route("/slow/:millis", get(slow))
}

async fn test() -> &'static str {
    "hi"
}

/// Respond only after the requested number of milliseconds,
/// which makes it possible to observe the drain behaviour.
async fn slow(Path(millis): Path<u64>) -> String {
    let delay = Duration::from_millis(millis).min(MAX_SLOW_REQUEST);
    tokio::time::sleep(delay).await;
    format!("slept for {}ms", delay.as_millis())
}
