// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Light sensor simulator for demo/testing

use rand::prelude::*;
use std::ops::RangeInclusive;

use crate::config::TopicConfig;
use crate::detection::{classify, ActuatorState, Classification};
use crate::error::Result;
use crate::streaming::MqttPublisher;

/// Luminosity range the simulated LDR reports
pub const SIMULATED_RANGE: RangeInclusive<i64> = 200..=1000;

/// One sampling tick: the raw value and the actuator decision derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightSample {
    pub sequence: u64,
    pub luminosity: i64,
    pub actuator_state: ActuatorState,
}

impl LightSample {
    pub fn classification(&self, threshold: i64) -> Classification {
        classify(self.luminosity, threshold)
    }
}

/// Simulates the field device: sample, decide the LED, publish both
pub struct LightSimulator {
    threshold: i64,
    sequence: u64,
    rng: rand::rngs::StdRng,
}

impl LightSimulator {
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold,
            sequence: 0,
            rng: rand::rngs::StdRng::from_entropy(),
        }
    }

    /// Reproducible sample stream
    pub fn with_seed(threshold: i64, seed: u64) -> Self {
        Self {
            threshold,
            sequence: 0,
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn sample(&mut self) -> LightSample {
        self.sequence += 1;
        let luminosity = self.rng.gen_range(SIMULATED_RANGE);

        LightSample {
            sequence: self.sequence,
            luminosity,
            actuator_state: ActuatorState::for_luminosity(luminosity, self.threshold),
        }
    }

    /// Publish a sample the way the device does: luminosity first, then the LED state
    pub async fn publish(
        &self,
        publisher: &MqttPublisher,
        topics: &TopicConfig,
        sample: &LightSample,
    ) -> Result<()> {
        publisher
            .publish(&topics.luminosity, &sample.luminosity.to_string())
            .await?;
        publisher
            .publish(&topics.actuator, sample.actuator_state.as_str())
            .await
    }
}
