// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

pub mod coordinator;
pub mod drain;
pub mod signal;
pub mod stop;
pub mod tracker;
pub mod worker;

pub use coordinator::{
    CoordinatorSettings, JoinOutcome, ShutdownCoordinator, ShutdownHandle, ShutdownPhase,
    ShutdownReport, TriggerSource,
};
pub use drain::{Drain, DrainOutcome};
pub use signal::{ExternalSignalSource, TerminationRequest};
pub use stop::StopSignal;
pub use tracker::{CompletionGuard, CompletionTracker, JoinTimeout};
pub use worker::{spawn_worker, Worker, WorkerError, WorkerHandle, WorkerId, WorkerState};
