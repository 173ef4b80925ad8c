// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! MQTT client for the telemetry topics

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{BusConnector, BusEvent, BusSession, InboundMessage};
use crate::config::BusConfig;
use crate::error::{BridgeError, Endpoint, Result};

/// Requests buffered between the client handle and its event loop
const REQUEST_CAPACITY: usize = 100;

/// Upper bound on flushing a DISCONNECT during shutdown
const DISCONNECT_FLUSH: Duration = Duration::from_secs(2);

fn mqtt_options(config: &BusConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
    options.set_keep_alive(config.keep_alive());
    options.set_clean_session(true);

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }

    options
}

/// Poll until the broker acknowledges the connection
async fn handshake(eventloop: &mut EventLoop) -> std::result::Result<(), String> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(format!("broker refused connection: {:?}", code)),
                };
            }
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
    }
}

/// Connector opening rumqttc sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct MqttConnector;

#[async_trait]
impl BusConnector for MqttConnector {
    type Session = MqttSession;

    async fn connect_bus(&mut self, config: &BusConfig) -> Result<MqttSession> {
        info!("Connecting to MQTT broker {}:{}", config.broker, config.port);

        let (client, mut eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);

        match tokio::time::timeout(config.connect_timeout(), handshake(&mut eventloop)).await {
            Ok(Ok(())) => {
                info!("MQTT connected to {}", config.broker);
                Ok(MqttSession { client, eventloop })
            }
            Ok(Err(reason)) => Err(BridgeError::connect(Endpoint::Bus, reason)),
            Err(_) => Err(BridgeError::connect(
                Endpoint::Bus,
                format!("no CONNACK within {:?}", config.connect_timeout()),
            )),
        }
    }
}

/// Live MQTT session; the event loop is polled by the bridge's own task
pub struct MqttSession {
    client: AsyncClient,
    eventloop: EventLoop,
}

#[async_trait]
impl BusSession for MqttSession {
    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| BridgeError::Bus(format!("subscribe to {} failed: {}", topic, e)))?;

        info!("Subscribed to MQTT topic: {}", topic);
        Ok(())
    }

    async fn next_event(&mut self) -> BusEvent {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        return BusEvent::Connected;
                    }
                    return BusEvent::ConnectionLost(format!("broker refused: {:?}", ack.code));
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return BusEvent::Message(InboundMessage::new(
                        publish.topic,
                        publish.payload.to_vec(),
                    ));
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    debug!("MQTT subscription acknowledged: {:?}", ack.return_codes);
                }
                Ok(_) => {}
                Err(e) => return BusEvent::ConnectionLost(e.to_string()),
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| BridgeError::Bus(format!("disconnect failed: {}", e)))?;

        // Drive the loop so the DISCONNECT packet actually leaves
        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_FLUSH, flush).await.is_err() {
            warn!("MQTT disconnect not confirmed within {:?}", DISCONNECT_FLUSH);
        }

        info!("MQTT disconnected");
        Ok(())
    }
}

/// Fire-and-forget publisher used by event producers
pub struct MqttPublisher {
    client: AsyncClient,
    driver: tokio::task::JoinHandle<()>,
}

impl MqttPublisher {
    /// Connect and spawn the event loop driver
    pub async fn connect(config: &BusConfig) -> Result<Self> {
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);

        match tokio::time::timeout(config.connect_timeout(), handshake(&mut eventloop)).await {
            Ok(Ok(())) => info!("MQTT connected to {}:{}", config.broker, config.port),
            Ok(Err(reason)) => return Err(BridgeError::connect(Endpoint::Bus, reason)),
            Err(_) => {
                return Err(BridgeError::connect(
                    Endpoint::Bus,
                    format!("no CONNACK within {:?}", config.connect_timeout()),
                ))
            }
        }

        let retry = config.reconnect_delay();
        let driver = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT reconnected");
                    }
                    Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT error: {:?}", e);
                        tokio::time::sleep(retry).await;
                    }
                }
            }
        });

        Ok(Self { client, driver })
    }

    pub async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .await
            .map_err(|e| BridgeError::Bus(format!("publish to {} failed: {}", topic, e)))
    }

    pub async fn disconnect(self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| BridgeError::Bus(format!("disconnect failed: {}", e)))?;

        if tokio::time::timeout(DISCONNECT_FLUSH, self.driver).await.is_err() {
            warn!("MQTT disconnect not confirmed within {:?}", DISCONNECT_FLUSH);
        }
        Ok(())
    }
}
