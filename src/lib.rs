// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! LuxBridge - IoT light telemetry bridge
//!
//! A field device (or the bundled simulator) samples ambient light, decides an
//! LED state from it and publishes both values on separate MQTT topics. The
//! bridge subscribes to both, pairs them into one reading, classifies it and
//! appends it to the store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Casa/Luminosidad  ┌────────────────────────────────────┐
//! │   Device /   │ ─────────────────→ │               Bridge               │
//! │  Simulator   │  Casa/LED_Estado   │  ┌────────────┐   ┌────────────┐   │
//! │              │ ─────────────────→ │  │ Correlator │ → │ Classifier │   │
//! └──────────────┘                    │  └────────────┘   └─────┬──────┘   │
//!                                     │  ┌──────────────────────┴───────┐  │
//!                                     │  │    Connection Supervisor     │  │
//!                                     │  └──────────────────────┬───────┘  │
//!                                     └─────────────────────────┼──────────┘
//!                                                               ↓
//!                                                      ┌────────────────┐
//!                                                      │ light_readings │
//!                                                      └────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod db;
pub mod detection;
pub mod error;
pub mod sensors;
pub mod streaming;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use config::Settings;
pub use crate::core::{Bridge, ConnectionState, ConnectionSupervisor};
pub use db::{Database, ReadingSink, SqliteConnector};
pub use detection::{classify, ActuatorState, Classification, Correlator, PersistedRecord};
pub use error::{BridgeError, Result};
pub use sensors::{LightSample, LightSimulator};
pub use streaming::{MqttConnector, MqttPublisher};

use tracing_subscriber::EnvFilter;

/// LuxBridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the fmt subscriber; `RUST_LOG` wins over the configured level
pub fn init_logging(level: config::LogLevel) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| BridgeError::Config(format!("logging already initialized: {}", e)))?;
    Ok(())
}
