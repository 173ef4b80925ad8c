// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Core module - connection supervision and the bridge event loop

mod engine;
mod supervisor;

pub use engine::Bridge;
pub use supervisor::ConnectionSupervisor;

use serde::{Deserialize, Serialize};

/// Lifecycle of one external endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}
