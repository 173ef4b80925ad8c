// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Error taxonomy for the bridge

use std::fmt;
use thiserror::Error;

/// External endpoint owned by the connection supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Store,
    Bus,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Store => write!(f, "store"),
            Endpoint::Bus => write!(f, "bus"),
        }
    }
}

/// Errors raised by the bridge components
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A store or bus connection could not be established
    #[error("{endpoint} connection failed: {reason}")]
    Connect { endpoint: Endpoint, reason: String },

    /// An inbound payload could not be decoded
    #[error("invalid payload {payload:?}: {reason}")]
    Parse { payload: String, reason: String },

    /// A completed reading could not be appended to the store
    #[error("store write failed: {0}")]
    Write(#[source] rusqlite::Error),

    /// A read-side store query failed
    #[error("store query failed: {0}")]
    Query(#[source] rusqlite::Error),

    /// A bus request (subscribe, disconnect) was rejected by the client
    #[error("bus request failed: {0}")]
    Bus(String),

    /// Settings could not be resolved
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn connect(endpoint: Endpoint, reason: impl fmt::Display) -> Self {
        BridgeError::Connect {
            endpoint,
            reason: reason.to_string(),
        }
    }

    /// True for failures that abort startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Connect { endpoint: Endpoint::Store, .. } | BridgeError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_connect_failure_is_fatal() {
        let err = BridgeError::connect(Endpoint::Store, "access denied");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "store connection failed: access denied");
    }

    #[test]
    fn test_parse_failure_is_recoverable() {
        let err = BridgeError::Parse {
            payload: "abc".into(),
            reason: "not a number".into(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "invalid payload \"abc\": not a number");
    }

    #[test]
    fn test_bus_connect_failure_is_recoverable() {
        let err = BridgeError::connect(Endpoint::Bus, "connection refused");
        assert!(!err.is_fatal());
    }
}
