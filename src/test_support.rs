// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Test doubles for the store and bus seams

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::config::{BusConfig, Settings, StoreConfig};
use crate::db::{ReadingSink, StoreConnector};
use crate::detection::PersistedRecord;
use crate::error::{BridgeError, Endpoint, Result};
use crate::streaming::{BusConnector, BusEvent, BusSession};

/// Default settings with short delays
pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.bus.reconnect_delay_ms = 10;
    settings.bus.reconnect_attempts = 2;
    settings.store.retry_delay_ms = 0;
    settings.store.path = Some(":memory:".into());
    settings
}

fn disk_full() -> BridgeError {
    BridgeError::Write(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
        Some("database or disk is full".to_string()),
    ))
}

/// Sink keeping appended records in memory, optionally failing the next N writes
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<PersistedRecord>>>,
    failures: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn fail_next(&mut self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl ReadingSink for RecordingSink {
    fn append(&mut self, record: &PersistedRecord) -> Result<()> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(disk_full());
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Store connector handing out `RecordingSink`s that share one record list
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    sink_records: Arc<Mutex<Vec<PersistedRecord>>>,
    write_failures: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    connect_failures: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl MockStore {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub fn failing_first(count: usize) -> Self {
        let store = Self::default();
        store.connect_failures.store(count, Ordering::SeqCst);
        store
    }

    pub fn failing_writes(self, count: usize) -> Self {
        self.write_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<PersistedRecord> {
        self.sink_records.lock().unwrap().clone()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl StoreConnector for MockStore {
    type Sink = RecordingSink;

    fn connect_store(&mut self, _config: &StoreConfig) -> Result<RecordingSink> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BridgeError::connect(Endpoint::Store, "access denied for user"));
        }
        Ok(RecordingSink {
            records: self.sink_records.clone(),
            failures: self.write_failures.clone(),
            closed: self.closed.clone(),
        })
    }
}

/// Bus connector whose sessions replay a fixed script of events
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    script: Arc<Mutex<VecDeque<BusEvent>>>,
    drain: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    connect_failures: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    disconnected: Arc<AtomicBool>,
}

impl MockBus {
    pub fn new(events: Vec<BusEvent>) -> Self {
        Self {
            script: Arc::new(Mutex::new(events.into())),
            ..Self::default()
        }
    }

    pub fn failing_first(count: usize, events: Vec<BusEvent>) -> Self {
        let bus = Self::new(events);
        bus.connect_failures.store(count, Ordering::SeqCst);
        bus
    }

    /// Resolves once the script has been fully consumed
    pub fn with_drain_signal(self) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        *self.drain.lock().unwrap() = Some(tx);
        (self, rx)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MockSession {
    bus: MockBus,
}

#[async_trait]
impl BusSession for MockSession {
    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.bus.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> BusEvent {
        let next = self.bus.script.lock().unwrap().pop_front();
        match next {
            Some(event) => event,
            None => {
                let drain = self.bus.drain.lock().unwrap().take();
                if let Some(tx) = drain {
                    let _ = tx.send(());
                }
                std::future::pending().await
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.bus.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BusConnector for MockBus {
    type Session = MockSession;

    async fn connect_bus(&mut self, _config: &BusConfig) -> Result<MockSession> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BridgeError::connect(Endpoint::Bus, "connection refused"));
        }
        Ok(MockSession { bus: self.clone() })
    }
}
