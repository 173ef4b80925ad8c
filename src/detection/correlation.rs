// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Correlation of the luminosity and actuator streams into single readings

use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{ActuatorState, PersistedRecord, Reading};
use crate::config::{Settings, TopicConfig};
use crate::db::ReadingSink;
use crate::error::{BridgeError, Result};

/// How unrecognized actuator payloads are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorPolicy {
    /// Store any payload verbatim
    Permissive,
    /// Discard payloads other than the two known states
    Strict,
}

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Topic is not one of ours
    Ignored,
    /// Payload rejected, pending state untouched
    Discarded,
    /// Field stored, reading still incomplete
    Pending,
    /// Reading completed and appended
    Persisted(PersistedRecord),
    /// Reading completed but the append failed; the reading is lost
    Dropped(PersistedRecord),
}

/// Running counters, reported at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    pub accepted: u64,
    pub discarded: u64,
    pub stale: u64,
    pub persisted: u64,
    pub dropped: u64,
}

enum Field {
    Luminosity(i64),
    Actuator(ActuatorState),
}

/// Decode a luminosity payload; surrounding whitespace and a sign are accepted
pub fn parse_luminosity(text: &str) -> Result<i64> {
    text.trim().parse::<i64>().map_err(|e| BridgeError::Parse {
        payload: text.to_string(),
        reason: e.to_string(),
    })
}

/// Decode an actuator payload under the given policy
pub fn parse_actuator_state(text: &str, policy: ActuatorPolicy) -> Result<ActuatorState> {
    let state = ActuatorState::from_payload(text);
    if policy == ActuatorPolicy::Strict && !state.is_recognized() {
        return Err(BridgeError::Parse {
            payload: text.to_string(),
            reason: "unrecognized actuator state".to_string(),
        });
    }
    Ok(state)
}

/// Owns the single pending reading and the sink completed readings go to
pub struct Correlator<S> {
    topics: TopicConfig,
    threshold: i64,
    policy: ActuatorPolicy,
    pending_timeout: Option<Duration>,
    pending: Reading,
    sink: S,
    stats: CorrelatorStats,
}

impl<S: ReadingSink> Correlator<S> {
    pub fn new(sink: S, settings: &Settings) -> Self {
        let policy = if settings.correlation.strict_actuator {
            ActuatorPolicy::Strict
        } else {
            ActuatorPolicy::Permissive
        };

        Self {
            topics: settings.topics.clone(),
            threshold: settings.classification.threshold,
            policy,
            pending_timeout: settings.correlation.pending_timeout(),
            pending: Reading::default(),
            sink,
            stats: CorrelatorStats::default(),
        }
    }

    pub fn on_message(&mut self, topic: &str, payload: &[u8]) -> Outcome {
        self.on_message_at(topic, payload, Instant::now())
    }

    /// Handle one message as if it arrived at `now`
    pub fn on_message_at(&mut self, topic: &str, payload: &[u8], now: Instant) -> Outcome {
        let is_luminosity = topic == self.topics.luminosity;
        if !is_luminosity && topic != self.topics.actuator {
            debug!("Ignoring message on unexpected topic {}", topic);
            return Outcome::Ignored;
        }

        let text = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!("Discarding non UTF-8 payload on {}: {}", topic, e);
                self.stats.discarded += 1;
                return Outcome::Discarded;
            }
        };

        info!("Received {} = {}", topic, text);

        let decoded = if is_luminosity {
            parse_luminosity(text).map(Field::Luminosity)
        } else {
            parse_actuator_state(text, self.policy).map(Field::Actuator)
        };

        let field = match decoded {
            Ok(field) => field,
            Err(e) => {
                warn!("Discarding message on {}: {}", topic, e);
                self.stats.discarded += 1;
                return Outcome::Discarded;
            }
        };

        if let Field::Actuator(ActuatorState::Unrecognized(raw)) = &field {
            warn!("Unrecognized actuator state {:?}, storing verbatim", raw);
        }

        self.stats.accepted += 1;
        self.expire_stale(now);

        match field {
            Field::Luminosity(value) => self.pending.set_luminosity(value, now),
            Field::Actuator(state) => self.pending.set_actuator_state(state, now),
        }

        self.complete()
    }

    fn expire_stale(&mut self, now: Instant) {
        let (Some(timeout), Some(started)) = (self.pending_timeout, self.pending.started_at) else {
            return;
        };
        if now.saturating_duration_since(started) > timeout {
            warn!(
                "Discarding half-complete reading older than {:?}: {:?}",
                timeout, self.pending
            );
            self.pending.clear();
            self.stats.stale += 1;
        }
    }

    fn complete(&mut self) -> Outcome {
        // The slot is emptied here regardless of the append result
        let Some((luminosity, state)) = self.pending.take_complete() else {
            return Outcome::Pending;
        };

        let record = PersistedRecord::new(luminosity, state, self.threshold);

        match self.sink.append(&record) {
            Ok(()) => {
                info!(
                    "Saved reading at {}: luminosity={} actuator={} classification={}",
                    record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                    record.luminosity,
                    record.actuator_state,
                    record.classification
                );
                self.stats.persisted += 1;
                Outcome::Persisted(record)
            }
            Err(e) => {
                let payload = serde_json::to_string(&record)
                    .unwrap_or_else(|_| format!("{:?}", record));
                error!("Failed to save reading, dropping it: {} (record: {})", e, payload);
                self.stats.dropped += 1;
                Outcome::Dropped(record)
            }
        }
    }

    pub fn pending(&self) -> &Reading {
        &self.pending
    }

    pub fn stats(&self) -> CorrelatorStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the correlator, returning the sink and the leftover pending reading
    pub fn into_parts(self) -> (S, Reading, CorrelatorStats) {
        (self.sink, self.pending, self.stats)
    }
}
