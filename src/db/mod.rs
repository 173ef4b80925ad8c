// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Database module for persistent storage

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::detection::PersistedRecord;
use crate::error::{BridgeError, Endpoint, Result};

/// Durable destination for completed readings
pub trait ReadingSink {
    /// Append one record; each call is its own unit of durability
    fn append(&mut self, record: &PersistedRecord) -> Result<()>;

    /// Release the underlying connection
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Opens the store for the connection supervisor
pub trait StoreConnector {
    type Sink: ReadingSink;

    /// Single connection attempt, no retry
    fn connect_store(&mut self, config: &StoreConfig) -> Result<Self::Sink>;
}

/// SQLite-backed store connector
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl StoreConnector for SqliteConnector {
    type Sink = Database;

    fn connect_store(&mut self, config: &StoreConfig) -> Result<Database> {
        Database::open(config)
    }
}

/// Database manager
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.db_path();

        // Create parent directories
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BridgeError::connect(Endpoint::Store, e))?;
            }
        }

        let conn = Connection::open(&path).map_err(|e| BridgeError::connect(Endpoint::Store, e))?;
        conn.busy_timeout(config.busy_timeout())
            .map_err(|e| BridgeError::connect(Endpoint::Store, e))?;

        // WAL keeps readers from blocking the single writer
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        "#,
        )
        .map_err(|e| BridgeError::connect(Endpoint::Store, e))?;

        let db = Self { conn };
        db.create_tables()
            .map_err(|e| BridgeError::connect(Endpoint::Store, e))?;

        info!("Database opened at {:?}", path);
        Ok(db)
    }

    /// Create database tables
    fn create_tables(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS light_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                luminosity INTEGER NOT NULL,
                actuator_state TEXT NOT NULL,
                classification TEXT NOT NULL,
                recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_light_readings_recorded_at
                ON light_readings(recorded_at);
        "#,
        )
    }

    /// Most recent readings, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredReading>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, luminosity, actuator_state, classification, recorded_at
             FROM light_readings ORDER BY id DESC LIMIT ?1",
            )
            .map_err(BridgeError::Query)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(StoredReading {
                    id: row.get(0)?,
                    luminosity: row.get(1)?,
                    actuator_state: row.get(2)?,
                    classification: row.get(3)?,
                    recorded_at: row.get(4)?,
                })
            })
            .map_err(BridgeError::Query)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(BridgeError::Query)?);
        }

        Ok(results)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM light_readings", [], |row| row.get(0))
            .map_err(BridgeError::Query)?;
        Ok(count as usize)
    }
}

impl ReadingSink for Database {
    fn append(&mut self, record: &PersistedRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO light_readings (luminosity, actuator_state, classification, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.luminosity,
                record.actuator_state.as_str(),
                record.classification.as_str(),
                record.recorded_at.to_rfc3339(),
            ],
        )
        .map_err(BridgeError::Write)?;

        debug!("Inserted reading row {}", self.conn.last_insert_rowid());
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| BridgeError::Write(e))?;
        info!("Database closed");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoredReading {
    pub id: i64,
    pub luminosity: i64,
    pub actuator_state: String,
    pub classification: String,
    pub recorded_at: String,
}
