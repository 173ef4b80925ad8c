// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Streaming module - publish/subscribe bus access

mod mqtt;

pub use mqtt::*;

use async_trait::async_trait;

use crate::config::BusConfig;
use crate::error::Result;

/// A message delivered on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Lifecycle and data events surfaced by a bus session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Handshake completed after a reconnect
    Connected,
    Message(InboundMessage),
    /// The session dropped; polling again retries the connection
    ConnectionLost(String),
}

/// An open bus session
#[async_trait]
pub trait BusSession: Send {
    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Wait for the next event; drives the client's I/O
    async fn next_event(&mut self) -> BusEvent;

    async fn disconnect(&mut self) -> Result<()>;
}

/// Opens bus sessions for the connection supervisor
#[async_trait]
pub trait BusConnector: Send {
    type Session: BusSession;

    /// Single attempt; returns once the connect handshake succeeded
    async fn connect_bus(&mut self, config: &BusConfig) -> Result<Self::Session>;
}
