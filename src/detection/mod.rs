// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Reading model, classification and correlation

mod classification;
mod correlation;

pub use classification::*;
pub use correlation::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Wire string for the actuator ON state
pub const ACTUATOR_ON: &str = "ENCENDIDO";
/// Wire string for the actuator OFF state
pub const ACTUATOR_OFF: &str = "APAGADO";

/// Actuator (LED) state as reported by the producer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ActuatorState {
    On,
    Off,
    /// Payload outside the known states, kept verbatim
    Unrecognized(String),
}

impl ActuatorState {
    /// Decode a payload; anything but the exact wire strings is `Unrecognized`
    pub fn from_payload(payload: &str) -> Self {
        match payload {
            ACTUATOR_ON => ActuatorState::On,
            ACTUATOR_OFF => ActuatorState::Off,
            other => ActuatorState::Unrecognized(other.to_string()),
        }
    }

    /// Producer decision rule: the LED is lit in low light
    pub fn for_luminosity(luminosity: i64, threshold: i64) -> Self {
        match classify(luminosity, threshold) {
            Classification::LowLight => ActuatorState::On,
            Classification::HighLight => ActuatorState::Off,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActuatorState::On => ACTUATOR_ON,
            ActuatorState::Off => ACTUATOR_OFF,
            ActuatorState::Unrecognized(raw) => raw.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ActuatorState::Unrecognized(_))
    }
}

impl fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ActuatorState> for String {
    fn from(state: ActuatorState) -> Self {
        state.as_str().to_string()
    }
}

impl From<String> for ActuatorState {
    fn from(raw: String) -> Self {
        ActuatorState::from_payload(&raw)
    }
}

/// The single in-flight reading awaiting its second field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    pub luminosity: Option<i64>,
    pub actuator_state: Option<ActuatorState>,
    /// Arrival of the oldest field still held
    pub started_at: Option<Instant>,
}

impl Reading {
    pub fn is_empty(&self) -> bool {
        self.luminosity.is_none() && self.actuator_state.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.luminosity.is_some() && self.actuator_state.is_some()
    }

    pub fn set_luminosity(&mut self, value: i64, now: Instant) {
        if self.actuator_state.is_none() {
            self.started_at = Some(now);
        }
        self.luminosity = Some(value);
    }

    pub fn set_actuator_state(&mut self, state: ActuatorState, now: Instant) {
        if self.luminosity.is_none() {
            self.started_at = Some(now);
        }
        self.actuator_state = Some(state);
    }

    /// Take both fields if complete, leaving the slot empty
    pub fn take_complete(&mut self) -> Option<(i64, ActuatorState)> {
        if !self.is_complete() {
            return None;
        }
        let taken = std::mem::take(self);
        match (taken.luminosity, taken.actuator_state) {
            (Some(luminosity), Some(state)) => Some((luminosity, state)),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Reading::default();
    }
}

/// A classified reading as written to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub luminosity: i64,
    pub actuator_state: ActuatorState,
    pub classification: Classification,
    /// Assigned at persistence time
    pub recorded_at: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn new(luminosity: i64, actuator_state: ActuatorState, threshold: i64) -> Self {
        Self {
            luminosity,
            actuator_state,
            classification: classify(luminosity, threshold),
            recorded_at: Utc::now(),
        }
    }
}
