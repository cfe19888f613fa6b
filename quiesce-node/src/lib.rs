// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod error;
pub mod node;

pub use node::{QuiesceNode, StartedNode};
