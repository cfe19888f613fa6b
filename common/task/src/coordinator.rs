// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::drain::{Drain, DrainOutcome};
use crate::signal::{ExternalSignalSource, TerminationRequest};
use crate::stop::StopSignal;
use crate::tracker::CompletionTracker;
use crate::worker::{spawn_worker, Worker, WorkerHandle, WorkerId};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownPhase {
    Running,
    ShuttingDown,
    Drained,
    Terminated,
}

/// What caused the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Manual,
    Timer(Duration),
    Signal(TerminationRequest),
    Custom(&'static str),
}

impl Display for TriggerSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Manual => write!(f, "manual request"),
            TriggerSource::Timer(after) => write!(f, "timer expiring after {after:?}"),
            TriggerSource::Signal(signal) => write!(f, "signal {signal}"),
            TriggerSource::Custom(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Time given to the drain step to let in-flight work finish.
    pub grace_period: Duration,

    /// Upper bound on a single worker's cleanup.
    pub cleanup_limit: Option<Duration>,

    /// Upper bound on waiting for all workers to report completion.
    /// If unset, the coordinator waits for as long as it takes.
    ///
    /// Once it expires the shutdown is forced: the drain step is skipped, the drainable
    /// component is dropped without a grace period and the report carries
    /// [JoinOutcome::TimedOut]. The workers still running are left to the process exit.
    pub join_timeout: Option<Duration>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        CoordinatorSettings {
            grace_period: DEFAULT_GRACE_PERIOD,
            cleanup_limit: None,
            join_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Completed,
    TimedOut { outstanding: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub trigger: TriggerSource,
    pub workers: usize,
    pub join: JoinOutcome,
    pub drain: Option<DrainOutcome>,

    /// Time between the trigger being observed and the shutdown completing.
    pub elapsed: Duration,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.join == JoinOutcome::Completed
            && !matches!(self.drain, Some(DrainOutcome::Forced { .. }))
    }
}

/// One-shot latch shared by every trigger path. Only the first firing is recorded.
#[derive(Debug, Default)]
struct TriggerLatch {
    requested: CancellationToken,
    source: OnceLock<TriggerSource>,
}

impl TriggerLatch {
    fn fire(&self, source: TriggerSource) -> bool {
        if let Err(source) = self.source.set(source) {
            if let Some(original) = self.source.get() {
                warn!("shutdown has already been requested by {original}. ignoring the {source}");
            }
            return false;
        }
        info!("shutdown requested by {source}");
        self.requested.cancel();
        true
    }
}

/// Cloneable handle that allows requesting shutdown programmatically.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    latch: Arc<TriggerLatch>,
}

impl ShutdownHandle {
    /// Request shutdown. Returns `true` only if this was the request that initiated it.
    pub fn trigger(&self, source: TriggerSource) -> bool {
        self.latch.fire(source)
    }

    pub fn is_triggered(&self) -> bool {
        self.latch.requested.is_cancelled()
    }
}

/// Drives the process through its shutdown sequence:
/// waits for the first trigger, tells every worker to stop, waits for all of them to finish
/// and only then drains the optional externally reachable component.
pub struct ShutdownCoordinator {
    settings: CoordinatorSettings,
    latch: Arc<TriggerLatch>,

    /// Futures that upon completion will request the shutdown.
    triggers: JoinSet<()>,

    stop: StopSignal,
    tracker: CompletionTracker,
    drain: Option<Box<dyn Drain>>,
    phase: watch::Sender<ShutdownPhase>,
    workers: usize,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        ShutdownCoordinator::new(CoordinatorSettings::default())
    }
}

impl ShutdownCoordinator {
    /// Create a coordinator without any trigger registered.
    /// Shutdown can then only be requested through a [ShutdownHandle].
    pub fn new(settings: CoordinatorSettings) -> Self {
        ShutdownCoordinator {
            settings,
            latch: Arc::new(TriggerLatch::default()),
            triggers: JoinSet::new(),
            stop: StopSignal::new(),
            tracker: CompletionTracker::new(),
            drain: None,
            phase: watch::Sender::new(ShutdownPhase::Running),
            workers: 0,
        }
    }

    /// Register a future that upon completion will request the shutdown.
    #[must_use]
    #[track_caller]
    pub fn with_shutdown<F>(mut self, source: TriggerSource, shutdown: F) -> Self
    where
        F: Future<Output = ()>,
        F: Send + 'static,
    {
        let latch = self.latch.clone();
        self.triggers.spawn(async move {
            shutdown.await;
            latch.fire(source);
        });
        self
    }

    /// Request the shutdown once the provided duration has passed.
    #[must_use]
    #[track_caller]
    pub fn with_timer(self, after: Duration) -> Self {
        self.with_shutdown(TriggerSource::Timer(after), tokio::time::sleep(after))
    }

    /// Request the shutdown upon the first termination request received from the source.
    #[must_use]
    #[track_caller]
    pub fn with_signal_source(mut self, source: ExternalSignalSource) -> Self {
        let latch = self.latch.clone();
        self.triggers.spawn(async move {
            if let Some(request) = source.recv().await {
                latch.fire(TriggerSource::Signal(request));
            }
        });
        self
    }

    /// Request the shutdown upon receiving SIGINT or SIGTERM.
    #[track_caller]
    pub fn with_default_signals(self) -> std::io::Result<Self> {
        Ok(self.with_signal_source(ExternalSignalSource::install()?))
    }

    /// Attach the component that gets drained after all workers have finished.
    #[must_use]
    pub fn with_drain(mut self, drain: Box<dyn Drain>) -> Self {
        self.drain = Some(drain);
        self
    }

    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            latch: self.latch.clone(),
        }
    }

    pub fn phase_watcher(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase.subscribe()
    }

    /// Obtain a clone of the stop signal that is closed once the shutdown begins.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Register the worker with the completion tracker and spawn it on the current runtime.
    #[track_caller]
    pub fn spawn_worker<W: Worker>(&mut self, worker: W) -> WorkerHandle {
        let id = WorkerId(self.workers);
        self.workers += 1;

        let guard = self.tracker.register_one();
        spawn_worker(
            id,
            worker,
            self.stop.clone(),
            guard,
            self.settings.cleanup_limit,
        )
    }

    async fn join_workers(&self) -> JoinOutcome {
        let Some(limit) = self.settings.join_timeout else {
            self.tracker.join().await;
            return JoinOutcome::Completed;
        };

        match self.tracker.join_timeout(limit).await {
            Ok(_) => JoinOutcome::Completed,
            Err(err) => {
                error!("{err}");
                JoinOutcome::TimedOut {
                    outstanding: err.outstanding,
                }
            }
        }
    }

    async fn drain_component(&mut self) -> Option<DrainOutcome> {
        let drain = self.drain.take()?;
        let grace = self.settings.grace_period;
        info!("sending shutdown ({grace:?} grace period)...");
        let outcome = drain.drain(grace).await;
        match outcome {
            DrainOutcome::Graceful => info!("server shutdown complete"),
            DrainOutcome::Forced { remaining } => {
                warn!("server shutdown complete after forcibly terminating {remaining} in-flight activities")
            }
        }
        Some(outcome)
    }

    /// Wait until a shutdown trigger fires and perform the full shutdown sequence.
    pub async fn run_until_shutdown(mut self) -> ShutdownReport {
        info!("waiting for shutdown trigger...");
        self.latch.requested.cancelled().await;

        let trigger = self
            .latch
            .source
            .get()
            .copied()
            .unwrap_or(TriggerSource::Manual);
        let started = Instant::now();

        self.phase.send_replace(ShutdownPhase::ShuttingDown);
        info!("closing the stop signal for {} worker(s)", self.workers);
        self.stop.trigger();

        let join = self.join_workers().await;
        let drain = match join {
            JoinOutcome::Completed => {
                info!("all workers finished");
                self.phase.send_replace(ShutdownPhase::Drained);
                self.drain_component().await
            }
            JoinOutcome::TimedOut { .. } => {
                if self.drain.take().is_some() {
                    warn!("workers are still running. skipping the drain and terminating");
                }
                None
            }
        };

        self.triggers.abort_all();
        self.phase.send_replace(ShutdownPhase::Terminated);
        info!("terminating");

        ShutdownReport {
            trigger,
            workers: self.workers,
            join,
            drain,
            elapsed: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerError;
    use async_trait::async_trait;
    use quiesce_test_utils::traits::{ElapsedExt, Timeboxed};
    use std::sync::Mutex;
    use tokio::time::sleep;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        CleanedUp(usize),
        Drained { phase: ShutdownPhase, outstanding: usize },
    }

    type Events = Arc<Mutex<Vec<Event>>>;

    struct RecordingWorker {
        ordinal: usize,
        cleanup_delay: Duration,
        events: Events,
    }

    #[async_trait]
    impl Worker for RecordingWorker {
        async fn cleanup(&mut self) -> Result<(), WorkerError> {
            sleep(self.cleanup_delay).await;
            self.events
                .lock()
                .unwrap()
                .push(Event::CleanedUp(self.ordinal));
            Ok(())
        }
    }

    struct StuckWorker;

    #[async_trait]
    impl Worker for StuckWorker {
        async fn cleanup(&mut self) -> Result<(), WorkerError> {
            futures::future::pending().await
        }
    }

    struct PanickingWorker;

    #[async_trait]
    impl Worker for PanickingWorker {
        async fn work(&mut self) -> Result<(), WorkerError> {
            panic!("worker could not continue")
        }
    }

    struct RecordingDrain {
        events: Events,
        phase: watch::Receiver<ShutdownPhase>,
        tracker: CompletionTracker,
        outcome: DrainOutcome,
    }

    #[async_trait]
    impl Drain for RecordingDrain {
        async fn drain(self: Box<Self>, _grace: Duration) -> DrainOutcome {
            let phase = *self.phase.borrow();
            self.events.lock().unwrap().push(Event::Drained {
                phase,
                outstanding: self.tracker.outstanding(),
            });
            self.outcome
        }
    }

    fn recording_drain(coordinator: &ShutdownCoordinator, events: &Events) -> Box<dyn Drain> {
        Box::new(RecordingDrain {
            events: events.clone(),
            phase: coordinator.phase_watcher(),
            tracker: coordinator.tracker.clone(),
            outcome: DrainOutcome::Graceful,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn drain_happens_strictly_after_every_worker_finished() {
        for workers in [0usize, 1, 5, 100] {
            let events: Events = Default::default();
            let timer = Duration::from_secs(5);
            let cleanup_delay = Duration::from_secs(1);

            let mut coordinator = ShutdownCoordinator::default().with_timer(timer);
            let drain = recording_drain(&coordinator, &events);
            coordinator = coordinator.with_drain(drain);

            for ordinal in 0..workers {
                coordinator.spawn_worker(RecordingWorker {
                    ordinal,
                    cleanup_delay,
                    events: events.clone(),
                });
            }

            let start = Instant::now();
            let report = coordinator.run_until_shutdown().await;

            assert!(start.elapsed() >= timer);
            assert_eq!(report.trigger, TriggerSource::Timer(timer));
            assert_eq!(report.workers, workers);
            assert_eq!(report.join, JoinOutcome::Completed);
            assert_eq!(report.drain, Some(DrainOutcome::Graceful));
            assert!(report.is_clean());
            if workers > 0 {
                assert!(report.elapsed >= cleanup_delay);
            }

            let events = events.lock().unwrap();
            assert_eq!(events.len(), workers + 1);
            assert_eq!(
                events.last(),
                Some(&Event::Drained {
                    phase: ShutdownPhase::Drained,
                    outstanding: 0
                })
            );
            let mut cleaned: Vec<_> = events[..workers]
                .iter()
                .map(|event| match event {
                    Event::CleanedUp(ordinal) => *ordinal,
                    Event::Drained { .. } => panic!("drained before all workers finished"),
                })
                .collect();
            cleaned.sort_unstable();
            assert_eq!(cleaned, (0..workers).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn nothing_happens_without_a_trigger() {
        let coordinator = ShutdownCoordinator::default();
        let phase = coordinator.phase_watcher();

        let res = coordinator.run_until_shutdown().timeboxed().await;
        assert!(res.has_elapsed());
        assert_eq!(*phase.borrow(), ShutdownPhase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_first_trigger_is_honoured() {
        let coordinator = ShutdownCoordinator::default()
            .with_shutdown(TriggerSource::Custom("late custom trigger"), async {
                sleep(Duration::from_millis(10)).await
            })
            .with_timer(Duration::from_secs(60));
        let handle = coordinator.handle();
        let other_handle = handle.clone();

        assert!(!handle.is_triggered());
        assert!(handle.trigger(TriggerSource::Manual));
        assert!(!other_handle.trigger(TriggerSource::Manual));
        assert!(!handle.trigger(TriggerSource::Custom("another one")));
        assert!(other_handle.is_triggered());

        let report = coordinator.run_until_shutdown().await;
        assert_eq!(report.trigger, TriggerSource::Manual);
        assert_eq!(report.drain, None);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn signal_source_triggers_the_shutdown() -> anyhow::Result<()> {
        let source = ExternalSignalSource::from_stream(futures::stream::iter([
            TerminationRequest::Terminate,
            TerminationRequest::Interrupt,
        ]));
        let coordinator = ShutdownCoordinator::default().with_signal_source(source);

        let report = coordinator.run_until_shutdown().timeboxed().await?;
        assert_eq!(
            report.trigger,
            TriggerSource::Signal(TerminationRequest::Terminate)
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn workers_are_stopped_on_trigger() {
        let events: Events = Default::default();
        let mut coordinator = ShutdownCoordinator::default();
        let stop = coordinator.stop_signal();
        let mut phase = coordinator.phase_watcher();
        let mut handle = coordinator.spawn_worker(RecordingWorker {
            ordinal: 0,
            cleanup_delay: Duration::from_secs(1),
            events: events.clone(),
        });
        let shutdown = coordinator.handle();

        let run = tokio::spawn(coordinator.run_until_shutdown());
        assert!(handle.wait_for_state(crate::worker::WorkerState::Running).await);
        assert!(!stop.is_triggered());

        shutdown.trigger(TriggerSource::Manual);
        phase
            .wait_for(|phase| *phase >= ShutdownPhase::ShuttingDown)
            .await
            .unwrap();
        assert!(stop.is_triggered());

        let report = run.await.unwrap();
        assert_eq!(*phase.borrow(), ShutdownPhase::Terminated);
        assert_eq!(report.workers, 1);
        assert_eq!(events.lock().unwrap().as_slice(), &[Event::CleanedUp(0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn join_timeout_skips_the_drain() {
        let events: Events = Default::default();
        let settings = CoordinatorSettings {
            join_timeout: Some(Duration::from_secs(3)),
            ..Default::default()
        };
        let mut coordinator = ShutdownCoordinator::new(settings);
        let phase = coordinator.phase_watcher();
        let drain = recording_drain(&coordinator, &events);
        coordinator = coordinator.with_drain(drain);

        coordinator.spawn_worker(StuckWorker);
        coordinator.spawn_worker(RecordingWorker {
            ordinal: 1,
            cleanup_delay: Duration::ZERO,
            events: events.clone(),
        });
        coordinator.handle().trigger(TriggerSource::Manual);

        let report = coordinator.run_until_shutdown().await;
        assert_eq!(report.join, JoinOutcome::TimedOut { outstanding: 1 });
        assert_eq!(report.drain, None);
        assert!(report.elapsed >= Duration::from_secs(3));
        assert!(!report.is_clean());
        assert_eq!(*phase.borrow(), ShutdownPhase::Terminated);

        // the drain never ran while a worker was still outstanding
        assert_eq!(events.lock().unwrap().as_slice(), &[Event::CleanedUp(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_limit_unblocks_the_join() {
        let settings = CoordinatorSettings {
            cleanup_limit: Some(Duration::from_secs(2)),
            ..Default::default()
        };
        let mut coordinator = ShutdownCoordinator::new(settings);
        coordinator.spawn_worker(StuckWorker);
        coordinator.handle().trigger(TriggerSource::Manual);

        let report = coordinator.run_until_shutdown().await;
        assert_eq!(report.join, JoinOutcome::Completed);
        assert!(report.elapsed >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn panicked_worker_does_not_block_the_shutdown() -> anyhow::Result<()> {
        let mut coordinator = ShutdownCoordinator::default();
        let mut handle = coordinator.spawn_worker(PanickingWorker);
        assert!(!handle.wait_for_state(crate::worker::WorkerState::Stopped).await);

        coordinator.handle().trigger(TriggerSource::Manual);
        let report = coordinator.run_until_shutdown().timeboxed().await?;
        assert_eq!(report.join, JoinOutcome::Completed);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn forced_drain_makes_the_shutdown_unclean() {
        let mut coordinator = ShutdownCoordinator::default();
        let drain = Box::new(RecordingDrain {
            events: Default::default(),
            phase: coordinator.phase_watcher(),
            tracker: coordinator.tracker.clone(),
            outcome: DrainOutcome::Forced { remaining: 2 },
        });
        coordinator = coordinator.with_drain(drain);
        coordinator.handle().trigger(TriggerSource::Manual);

        let report = coordinator.run_until_shutdown().await;
        assert_eq!(report.drain, Some(DrainOutcome::Forced { remaining: 2 }));
        assert!(!report.is_clean());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn shutdown_future_can_be_sent_across_threads() {
        let events: Events = Default::default();
        let coordinator = ShutdownCoordinator::default();
        let drain = recording_drain(&coordinator, &events);
        let shutdown = coordinator.with_drain(drain).run_until_shutdown();
        assert_send(&shutdown);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_runs_on_the_multi_thread_scheduler() -> anyhow::Result<()> {
        let events: Events = Default::default();
        let mut coordinator = ShutdownCoordinator::default();
        let drain = recording_drain(&coordinator, &events);
        coordinator = coordinator.with_drain(drain);
        for ordinal in 0..4 {
            coordinator.spawn_worker(RecordingWorker {
                ordinal,
                cleanup_delay: Duration::from_millis(10),
                events: events.clone(),
            });
        }
        let handle = coordinator.handle();

        let run = tokio::spawn(coordinator.run_until_shutdown());
        assert!(handle.trigger(TriggerSource::Manual));
        let report = run.execute_with_deadline(Duration::from_secs(2)).await??;

        assert_eq!(report.workers, 4);
        assert_eq!(report.drain, Some(DrainOutcome::Graceful));
        assert!(report.is_clean());
        assert_eq!(
            events.lock().unwrap().last(),
            Some(&Event::Drained {
                phase: ShutdownPhase::Drained,
                outstanding: 0
            })
        );
        Ok(())
    }

    #[test]
    fn trigger_sources_are_displayed() {
        assert_eq!(
            TriggerSource::Signal(TerminationRequest::Interrupt).to_string(),
            "signal SIGINT"
        );
        assert_eq!(
            TriggerSource::Timer(Duration::from_secs(5)).to_string(),
            "timer expiring after 5s"
        );
    }
}
