// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Bridge event loop: store first, then bus, then messages until shutdown

use std::future::Future;
use tracing::{info, warn};

use super::ConnectionSupervisor;
use crate::config::Settings;
use crate::db::StoreConnector;
use crate::detection::{Correlator, CorrelatorStats};
use crate::error::Result;
use crate::streaming::{BusConnector, InboundMessage};

enum Step<S> {
    Shutdown,
    Connected(Option<S>),
    Inbound(Option<InboundMessage>),
}

/// The bridge process: one thread of control, one pending reading
pub struct Bridge<SC, BC> {
    settings: Settings,
    supervisor: ConnectionSupervisor<SC, BC>,
}

impl<SC, BC> Bridge<SC, BC>
where
    SC: StoreConnector,
    BC: BusConnector,
{
    pub fn new(settings: Settings, store_connector: SC, bus_connector: BC) -> Self {
        let supervisor = ConnectionSupervisor::new(store_connector, bus_connector, &settings);
        Self {
            settings,
            supervisor,
        }
    }

    /// Run until `shutdown` resolves. Fails only if the store is unavailable at startup.
    pub async fn run<F>(mut self, shutdown: F) -> Result<CorrelatorStats>
    where
        F: Future<Output = ()>,
    {
        let sink = self.supervisor.establish_store().await?;
        let mut correlator = Correlator::new(sink, &self.settings);

        tokio::pin!(shutdown);
        let mut session: Option<BC::Session> = None;

        info!("Bridge started, waiting for the bus");

        loop {
            let step = match session.as_mut() {
                None => tokio::select! {
                    _ = &mut shutdown => Step::Shutdown,
                    connected = self.supervisor.establish_bus() => Step::Connected(connected),
                },
                Some(active) => tokio::select! {
                    _ = &mut shutdown => Step::Shutdown,
                    inbound = self.supervisor.next_message(active) => Step::Inbound(inbound),
                },
            };

            match step {
                Step::Shutdown => break,
                Step::Connected(connected) => session = connected,
                Step::Inbound(Some(message)) => {
                    correlator.on_message(&message.topic, &message.payload);
                }
                Step::Inbound(None) => {}
            }
        }

        info!("Shutdown signal received, cleaning up...");

        if let Some(mut active) = session {
            self.supervisor.disconnect_bus(&mut active).await;
        }

        let (sink, pending, stats) = correlator.into_parts();
        if !pending.is_empty() {
            warn!("Discarding half-complete reading: {:?}", pending);
        }
        self.supervisor.close_store(sink);

        info!(
            "Bridge stopped: {} messages accepted, {} discarded, {} stale, {} saved, {} dropped",
            stats.accepted, stats.discarded, stats.stale, stats.persisted, stats.dropped
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{ActuatorState, Classification};
    use crate::error::{BridgeError, Endpoint};
    use crate::streaming::BusEvent;
    use crate::test_support::{settings, MockBus, MockStore};

    fn msg(topic: &str, payload: &str) -> BusEvent {
        BusEvent::Message(InboundMessage::new(topic, payload.as_bytes()))
    }

    #[tokio::test]
    async fn test_store_failure_aborts_before_bus() {
        let store = MockStore::failing();
        let bus = MockBus::new(vec![]);

        let bridge = Bridge::new(settings(), store.clone(), bus.clone());
        let err = bridge.run(std::future::pending()).await.unwrap_err();

        assert!(matches!(err, BridgeError::Connect { endpoint: Endpoint::Store, .. }));
        assert!(err.is_fatal());
        assert_eq!(store.attempts(), 2);
        assert_eq!(bus.connects(), 0);
        assert!(bus.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_messages_flow_to_store() {
        let store = MockStore::ok();
        let (bus, drained) = MockBus::new(vec![
            msg("Casa/Luminosidad", "500"),
            msg("Casa/LED_Estado", "ENCENDIDO"),
            msg("Casa/LED_Estado", "APAGADO"),
            msg("Casa/Luminosidad", "oops"),
            msg("Casa/Luminosidad", "980"),
        ])
        .with_drain_signal();

        let bridge = Bridge::new(settings(), store.clone(), bus.clone());
        let stats = bridge
            .run(async {
                let _ = drained.await;
            })
            .await
            .unwrap();

        let records = store.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].luminosity, 500);
        assert_eq!(records[0].actuator_state, ActuatorState::On);
        assert_eq!(records[0].classification, Classification::LowLight);
        assert_eq!(records[1].luminosity, 980);
        assert_eq!(records[1].actuator_state, ActuatorState::Off);
        assert_eq!(records[1].classification, Classification::HighLight);

        assert_eq!(stats.persisted, 2);
        assert_eq!(stats.discarded, 1);
        assert_eq!(bus.connects(), 1);
        assert!(bus.disconnected());
        assert!(store.closed());
    }

    #[tokio::test]
    async fn test_write_failure_does_not_stall_bridge() {
        let store = MockStore::ok().failing_writes(1);
        let (bus, drained) = MockBus::new(vec![
            msg("Casa/Luminosidad", "100"),
            msg("Casa/LED_Estado", "ENCENDIDO"),
            msg("Casa/Luminosidad", "900"),
            msg("Casa/LED_Estado", "APAGADO"),
        ])
        .with_drain_signal();

        let stats = Bridge::new(settings(), store.clone(), bus)
            .run(async {
                let _ = drained.await;
            })
            .await
            .unwrap();

        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.persisted, 1);
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].luminosity, 900);
        assert_eq!(records[0].actuator_state, ActuatorState::Off);
    }

    #[tokio::test]
    async fn test_bus_outage_keeps_process_alive() {
        let store = MockStore::ok();
        let (bus, drained) = MockBus::failing_first(2, vec![
            msg("Casa/LED_Estado", "APAGADO"),
            msg("Casa/Luminosidad", "800"),
        ])
        .with_drain_signal();

        let mut s = settings();
        s.bus.reconnect_attempts = 1;

        let stats = Bridge::new(s, store.clone(), bus.clone())
            .run(async {
                let _ = drained.await;
            })
            .await
            .unwrap();

        assert_eq!(bus.connects(), 3);
        assert_eq!(stats.persisted, 1);
        assert_eq!(store.records()[0].luminosity, 800);
    }

    #[tokio::test]
    async fn test_shutdown_discards_half_reading() {
        let store = MockStore::ok();
        let (bus, drained) = MockBus::new(vec![msg("Casa/Luminosidad", "640")]).with_drain_signal();

        let stats = Bridge::new(settings(), store.clone(), bus)
            .run(async {
                let _ = drained.await;
            })
            .await
            .unwrap();

        assert_eq!(stats.accepted, 1);
        assert!(store.records().is_empty());
        assert!(store.closed());
    }
}
