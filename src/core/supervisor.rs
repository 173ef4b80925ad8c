// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Connection lifecycle for the store and the bus

use tracing::{debug, error, info, warn};

use super::ConnectionState;
use crate::config::{BusConfig, Settings, StoreConfig, TopicConfig};
use crate::db::{ReadingSink, StoreConnector};
use crate::error::{BridgeError, Endpoint, Result};
use crate::streaming::{BusConnector, BusEvent, BusSession, InboundMessage};

/// Owns both endpoint states; nothing else transitions them
pub struct ConnectionSupervisor<SC, BC> {
    store_connector: SC,
    bus_connector: BC,
    store_config: StoreConfig,
    bus_config: BusConfig,
    topics: TopicConfig,
    store_state: ConnectionState,
    bus_state: ConnectionState,
}

impl<SC, BC> ConnectionSupervisor<SC, BC>
where
    SC: StoreConnector,
    BC: BusConnector,
{
    pub fn new(store_connector: SC, bus_connector: BC, settings: &Settings) -> Self {
        Self {
            store_connector,
            bus_connector,
            store_config: settings.store.clone(),
            bus_config: settings.bus.clone(),
            topics: settings.topics.clone(),
            store_state: ConnectionState::Disconnected,
            bus_state: ConnectionState::Disconnected,
        }
    }

    pub fn store_state(&self) -> ConnectionState {
        self.store_state
    }

    pub fn bus_state(&self) -> ConnectionState {
        self.bus_state
    }

    pub fn is_store_connected(&self) -> bool {
        self.store_state == ConnectionState::Connected
    }

    pub fn is_bus_connected(&self) -> bool {
        self.bus_state == ConnectionState::Connected
    }

    fn transition(&mut self, endpoint: Endpoint, next: ConnectionState) {
        let state = match endpoint {
            Endpoint::Store => &mut self.store_state,
            Endpoint::Bus => &mut self.bus_state,
        };
        if *state != next {
            debug!("{} connection: {:?} -> {:?}", endpoint, *state, next);
            *state = next;
        }
    }

    /// One store connection attempt
    pub fn connect_store(&mut self) -> Result<SC::Sink> {
        self.transition(Endpoint::Store, ConnectionState::Connecting);
        info!("Connecting to store {:?}", self.store_config.db_path());

        match self.store_connector.connect_store(&self.store_config) {
            Ok(sink) => {
                self.transition(Endpoint::Store, ConnectionState::Connected);
                Ok(sink)
            }
            Err(e) => {
                self.transition(Endpoint::Store, ConnectionState::Failed);
                Err(e)
            }
        }
    }

    /// Startup path: one retry, then give up for good
    pub async fn establish_store(&mut self) -> Result<SC::Sink> {
        match self.connect_store() {
            Ok(sink) => return Ok(sink),
            Err(e) => {
                warn!("Store connection failed: {}; retrying once", e);
                tokio::time::sleep(self.store_config.retry_delay()).await;
            }
        }

        self.connect_store().map_err(|e| {
            error!("Store unavailable, the bridge cannot run without it: {}", e);
            e
        })
    }

    /// One bus connection attempt followed by the on-connect hook
    pub async fn connect_bus(&mut self) -> Result<BC::Session> {
        if !self.is_store_connected() {
            return Err(BridgeError::connect(
                Endpoint::Bus,
                "refusing to connect before the store is up",
            ));
        }

        self.transition(Endpoint::Bus, ConnectionState::Connecting);

        match self.bus_connector.connect_bus(&self.bus_config).await {
            Ok(mut session) => {
                self.transition(Endpoint::Bus, ConnectionState::Connected);
                self.on_connect(&mut session).await;
                Ok(session)
            }
            Err(e) => {
                self.transition(Endpoint::Bus, ConnectionState::Failed);
                Err(e)
            }
        }
    }

    /// Runs once per successful handshake
    async fn on_connect(&self, session: &mut BC::Session) {
        info!("Subscribing to telemetry topics");
        for topic in self.topics.all() {
            if let Err(e) = session.subscribe(topic).await {
                error!("{}", e);
            }
        }
        info!("Waiting for device data...");
    }

    /// A round of connect attempts; `None` after backing off when all fail
    pub async fn establish_bus(&mut self) -> Option<BC::Session> {
        let attempts = self.bus_config.reconnect_attempts.max(1);
        let delay = self.bus_config.reconnect_delay();

        for attempt in 1..=attempts {
            match self.connect_bus().await {
                Ok(session) => return Some(session),
                Err(e) => {
                    warn!("Bus connection attempt {}/{} failed: {}", attempt, attempts, e);
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let backoff = delay * attempts;
        error!(
            "Bus unreachable after {} attempts; no telemetry until it recovers, next round in {:?}",
            attempts, backoff
        );
        tokio::time::sleep(backoff).await;
        None
    }

    /// Pull the next data message, handling lifecycle events on the way
    pub async fn next_message(&mut self, session: &mut BC::Session) -> Option<InboundMessage> {
        match session.next_event().await {
            BusEvent::Message(message) => Some(message),
            BusEvent::Connected => {
                info!("Bus reconnected");
                self.transition(Endpoint::Bus, ConnectionState::Connected);
                self.on_connect(session).await;
                None
            }
            BusEvent::ConnectionLost(reason) => {
                if self.is_bus_connected() {
                    warn!("Bus connection lost: {}", reason);
                } else {
                    debug!("Bus still unavailable: {}", reason);
                }
                self.transition(Endpoint::Bus, ConnectionState::Connecting);
                tokio::time::sleep(self.bus_config.reconnect_delay()).await;
                None
            }
        }
    }

    pub async fn disconnect_bus(&mut self, session: &mut BC::Session) {
        if let Err(e) = session.disconnect().await {
            warn!("{}", e);
        }
        self.transition(Endpoint::Bus, ConnectionState::Disconnected);
    }

    pub fn close_store(&mut self, sink: SC::Sink) {
        if let Err(e) = sink.close() {
            warn!("Store did not close cleanly: {}", e);
        }
        self.transition(Endpoint::Store, ConnectionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{settings, MockBus, MockStore};

    #[tokio::test]
    async fn test_store_failure_blocks_bus() {
        let store = MockStore::failing();
        let bus = MockBus::new(vec![]);
        let mut supervisor = ConnectionSupervisor::new(store.clone(), bus.clone(), &settings());

        assert!(supervisor.establish_store().await.is_err());
        assert_eq!(store.attempts(), 2);
        assert_eq!(supervisor.store_state(), ConnectionState::Failed);

        assert!(supervisor.connect_bus().await.is_err());
        assert_eq!(bus.connects(), 0);
        assert!(!supervisor.is_bus_connected());
    }

    #[tokio::test]
    async fn test_store_retry_recovers() {
        let store = MockStore::failing_first(1);
        let mut supervisor =
            ConnectionSupervisor::new(store.clone(), MockBus::new(vec![]), &settings());

        assert!(supervisor.establish_store().await.is_ok());
        assert_eq!(store.attempts(), 2);
        assert!(supervisor.is_store_connected());
    }

    #[tokio::test]
    async fn test_connect_subscribes_both_topics_once() {
        let bus = MockBus::new(vec![]);
        let mut supervisor = ConnectionSupervisor::new(MockStore::ok(), bus.clone(), &settings());

        supervisor.establish_store().await.unwrap();
        let _session = supervisor.connect_bus().await.unwrap();

        assert!(supervisor.is_bus_connected());
        assert_eq!(bus.connects(), 1);
        assert_eq!(
            bus.subscriptions(),
            vec!["Casa/Luminosidad".to_string(), "Casa/LED_Estado".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reconnect_runs_hook_again() {
        let bus = MockBus::new(vec![
            BusEvent::ConnectionLost("broker restarted".into()),
            BusEvent::Connected,
        ]);
        let mut supervisor = ConnectionSupervisor::new(MockStore::ok(), bus.clone(), &settings());
        supervisor.establish_store().await.unwrap();
        let mut session = supervisor.connect_bus().await.unwrap();

        assert!(supervisor.next_message(&mut session).await.is_none());
        assert_eq!(supervisor.bus_state(), ConnectionState::Connecting);

        assert!(supervisor.next_message(&mut session).await.is_none());
        assert!(supervisor.is_bus_connected());
        assert_eq!(bus.subscriptions().len(), 4);
    }

    #[tokio::test]
    async fn test_bus_failure_round_gives_up_without_panicking() {
        let bus = MockBus::failing_first(10, vec![]);
        let mut s = settings();
        s.bus.reconnect_attempts = 3;
        let mut supervisor = ConnectionSupervisor::new(MockStore::ok(), bus.clone(), &s);
        supervisor.establish_store().await.unwrap();

        assert!(supervisor.establish_bus().await.is_none());
        assert_eq!(bus.connects(), 3);
        assert_eq!(supervisor.bus_state(), ConnectionState::Failed);
        assert!(supervisor.is_store_connected());
    }

    #[tokio::test]
    async fn test_bus_recovers_within_round() {
        let bus = MockBus::failing_first(1, vec![]);
        let mut supervisor = ConnectionSupervisor::new(MockStore::ok(), bus.clone(), &settings());
        supervisor.establish_store().await.unwrap();

        assert!(supervisor.establish_bus().await.is_some());
        assert_eq!(bus.connects(), 2);
        assert!(supervisor.is_bus_connected());
    }
}
