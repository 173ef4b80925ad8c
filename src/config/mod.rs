// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Configuration module
//!
//! Settings are layered: built-in defaults, then an optional TOML file named by
//! `LUXBRIDGE_CONFIG`, then individual environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{BridgeError, Result};

/// Environment variable naming an optional TOML settings file
pub const CONFIG_FILE_VAR: &str = "LUXBRIDGE_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// MQTT broker connection
    pub bus: BusConfig,

    /// Topic names for the two telemetry streams
    pub topics: TopicConfig,

    /// Relational store
    pub store: StoreConfig,

    /// Light classification
    pub classification: ClassificationConfig,

    /// Pending-reading policy
    pub correlation: CorrelationConfig,

    /// Producer (device/simulator) timing
    pub producer: ProducerConfig,

    /// Default log filter when `RUST_LOG` is unset
    pub log_level: LogLevel,
}

/// MQTT broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    pub connect_timeout_secs: u64,
    pub reconnect_delay_ms: u64,
    /// Connect attempts per round before the bus is marked failed
    pub reconnect_attempts: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            broker: "broker.hivemq.com".to_string(),
            port: 1883,
            client_id: "Servidor_Iluminacion_IoT".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 10,
            reconnect_delay_ms: 5000,
            reconnect_attempts: 5,
        }
    }
}

impl BusConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub luminosity: String,
    pub actuator: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            luminosity: "Casa/Luminosidad".to_string(),
            actuator: "Casa/LED_Estado".to_string(),
        }
    }
}

impl TopicConfig {
    pub fn all(&self) -> [&str; 2] {
        [self.luminosity.as_str(), self.actuator.as_str()]
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the database file
    pub dir: PathBuf,

    /// Database name, stored as `<dir>/<database>.db`
    pub database: String,

    /// Explicit database path, overrides `dir` and `database`
    pub path: Option<PathBuf>,

    pub busy_timeout_ms: u64,

    /// Pause before the single startup retry
    pub retry_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
            database: "control_iluminacion".to_string(),
            path: None,
            busy_timeout_ms: 5000,
            retry_delay_ms: 2000,
        }
    }
}

impl StoreConfig {
    /// Store backed by an in-memory database
    pub fn in_memory() -> Self {
        Self {
            path: Some(PathBuf::from(":memory:")),
            ..Self::default()
        }
    }

    pub fn db_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => self.dir.join(format!("{}.db", self.database)),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Readings at or below this value are low light
    pub threshold: i64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self { threshold: 750 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Reject actuator payloads other than the two known states
    pub strict_actuator: bool,

    /// Discard a half-complete reading older than this; 0 disables
    pub pending_timeout_secs: u64,
}

impl CorrelationConfig {
    pub fn pending_timeout(&self) -> Option<Duration> {
        match self.pending_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub interval_secs: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self { interval_secs: 2 }
    }
}

impl ProducerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn load() -> Result<Self> {
        let base = match std::env::var_os(CONFIG_FILE_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {:?}", path);
        Ok(settings)
    }

    /// Defaults overridden by whatever `lookup` provides
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        env.string("MQTT_BROKER", &mut self.bus.broker);
        env.parse("MQTT_PORT", &mut self.bus.port)?;
        env.string("MQTT_CLIENT_ID", &mut self.bus.client_id);
        env.optional("MQTT_USERNAME", &mut self.bus.username);
        env.optional("MQTT_PASSWORD", &mut self.bus.password);
        env.parse("MQTT_KEEP_ALIVE_SECS", &mut self.bus.keep_alive_secs)?;
        env.parse("MQTT_CONNECT_TIMEOUT_SECS", &mut self.bus.connect_timeout_secs)?;
        env.parse("MQTT_RECONNECT_DELAY_MS", &mut self.bus.reconnect_delay_ms)?;
        env.parse("INTENTOS_RECONEXION", &mut self.bus.reconnect_attempts)?;

        env.string("TOPIC_LUMINOSIDAD", &mut self.topics.luminosity);
        env.string("TOPIC_LED_ESTADO", &mut self.topics.actuator);

        if let Some(dir) = env.get("STORE_DIR") {
            self.store.dir = PathBuf::from(dir);
        }
        env.string("STORE_DATABASE", &mut self.store.database);
        if let Some(path) = env.get("STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
        env.parse("STORE_BUSY_TIMEOUT_MS", &mut self.store.busy_timeout_ms)?;
        env.parse("STORE_RETRY_DELAY_MS", &mut self.store.retry_delay_ms)?;

        env.parse("UMBRAL_LUZ", &mut self.classification.threshold)?;
        env.parse("INTERVALO_LECTURA", &mut self.producer.interval_secs)?;

        env.flag("ACTUATOR_STRICT", &mut self.correlation.strict_actuator)?;
        env.parse("PENDING_TIMEOUT_SECS", &mut self.correlation.pending_timeout_secs)?;

        env.parse("LOG_LEVEL", &mut self.log_level)?;

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.topics.luminosity == self.topics.actuator {
            return Err(BridgeError::Config(format!(
                "luminosity and actuator topics must differ (both '{}')",
                self.topics.luminosity
            )));
        }
        if self.bus.reconnect_attempts == 0 {
            return Err(BridgeError::Config(
                "INTENTOS_RECONEXION must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Log the effective configuration without secrets
    pub fn log_summary(&self) {
        info!("MQTT broker: {}:{} as {}", self.bus.broker, self.bus.port, self.bus.client_id);
        if let Some(user) = &self.bus.username {
            let masked = "*".repeat(self.bus.password.as_deref().map_or(0, str::len));
            info!("MQTT user: {} (password: {})", user, masked);
        }
        info!("Topics: {} / {}", self.topics.luminosity, self.topics.actuator);
        info!("Store: {:?}", self.store.db_path());
        info!("Light threshold: {}", self.classification.threshold);
        if let Some(timeout) = self.correlation.pending_timeout() {
            info!("Pending reading timeout: {:?}", timeout);
        }
        if self.correlation.strict_actuator {
            info!("Actuator payloads validated strictly");
        }
    }
}

struct Env<'a, F>(&'a F);

impl<'a, F> Env<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = self.get(key) {
            *target = value;
        }
    }

    fn optional(&self, key: &str, target: &mut Option<String>) {
        if let Some(value) = self.get(key) {
            *target = Some(value);
        }
    }

    fn parse<T>(&self, key: &str, target: &mut T) -> Result<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(raw) = self.get(key) {
            *target = raw
                .trim()
                .parse()
                .map_err(|e| BridgeError::Config(format!("{}={:?}: {}", key, raw, e)))?;
        }
        Ok(())
    }

    fn flag(&self, key: &str, target: &mut bool) -> Result<()> {
        if let Some(raw) = self.get(key) {
            *target = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(BridgeError::Config(format!(
                        "{}={:?}: expected a boolean",
                        key, raw
                    )))
                }
            };
        }
        Ok(())
    }
}
