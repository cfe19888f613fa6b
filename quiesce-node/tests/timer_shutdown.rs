// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use quiesce_node::config::{Config, ShutdownTrigger, WorkerKind};
use quiesce_node::QuiesceNode;
use quiesce_task::{JoinOutcome, TriggerSource};
use std::time::Duration;
use quiesce_test_utils::traits::Timeboxed;
use tokio::time::Instant;

fn timer_config(kind: WorkerKind) -> Config {
    let mut config = Config::default();
    config.workers.kind = kind;
    config.shutdown.trigger = ShutdownTrigger::Timer;
    config.http.enabled = false;
    config
}

#[tokio::test(start_paused = true)]
async fn idle_workers_stop_once_the_timer_expires() -> anyhow::Result<()> {
    let started = Instant::now();
    let node = QuiesceNode::new(timer_config(WorkerKind::Idle)).start().await?;
    assert!(node.http_address().is_none());

    let report = node.wait().await;
    let total = started.elapsed();

    assert_eq!(report.trigger, TriggerSource::Timer(Duration::from_secs(5)));
    assert_eq!(report.workers, 5);
    assert_eq!(report.join, JoinOutcome::Completed);
    assert_eq!(report.drain, None);
    assert!(report.is_clean());

    // every worker sleeps for a second concurrently, not one after another
    assert!(report.elapsed >= Duration::from_secs(1));
    assert!(report.elapsed < Duration::from_secs(2));
    assert!(total >= Duration::from_secs(6));
    assert!(total < Duration::from_secs(7));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn ticking_workers_stop_once_the_timer_expires() -> anyhow::Result<()> {
    let mut config = timer_config(WorkerKind::Tick);
    config.workers.count = 3;
    config.workers.cleanup_delay = Duration::from_millis(200);

    let report = QuiesceNode::new(config).start().await?.wait().await;
    assert_eq!(report.workers, 3);
    assert_eq!(report.join, JoinOutcome::Completed);
    assert!(report.elapsed >= Duration::from_millis(200));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stuck_shutdown_is_bounded_by_the_join_timeout() -> anyhow::Result<()> {
    let mut config = timer_config(WorkerKind::Idle);
    config.workers.cleanup_delay = Duration::from_secs(3600);
    config.shutdown.join_timeout = Some(Duration::from_secs(10));

    let report = QuiesceNode::new(config).start().await?.wait().await;
    assert_eq!(report.join, JoinOutcome::TimedOut { outstanding: 5 });
    assert!(!report.is_clean());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_preempts_the_timer() -> anyhow::Result<()> {
    let node = QuiesceNode::new(timer_config(WorkerKind::Idle)).start().await?;
    assert!(node.shutdown_handle().trigger(TriggerSource::Manual));

    let started = Instant::now();
    let report = node.wait().await;
    assert_eq!(report.trigger, TriggerSource::Manual);
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

fn assert_send<T: Send>(_: &T) {}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn node_with_http_shuts_down_from_a_spawned_task() -> anyhow::Result<()> {
    let mut config = timer_config(WorkerKind::Idle);
    config.workers.cleanup_delay = Duration::from_millis(50);
    config.shutdown.timer = Duration::from_millis(100);
    config.http.enabled = true;
    config.http.bind_address = "127.0.0.1:0".parse()?;

    let node = QuiesceNode::new(config).start().await?;
    let address = node.http_address().ok_or_else(|| anyhow::anyhow!("no http listener"))?;
    let body = reqwest::get(format!("http://{address}/test")).await?.text().await?;
    assert_eq!(body, "hi");

    let shutdown = node.wait();
    assert_send(&shutdown);
    let report = tokio::spawn(shutdown)
        .execute_with_deadline(Duration::from_secs(5))
        .await??;

    assert_eq!(report.workers, 5);
    assert_eq!(report.join, JoinOutcome::Completed);
    assert_eq!(report.drain, Some(quiesce_task::DrainOutcome::Graceful));
    assert!(report.is_clean());
    Ok(())
}
