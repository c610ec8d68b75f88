//! Error types shared across the crate.

use std::collections::HashSet;

use thiserror::Error;
use tracing::error;

use crate::host::{EndpointId, NetworkId};

/// Stable code used to deduplicate invariant-violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DuplicateBroker,
    MissingBroker,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCode::DuplicateBroker => 123_412,
            ErrorCode::MissingBroker => 123_414,
        }
    }
}

/// Broker registry invariant violations. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tried registering a broker for {0} that is already registered")]
    DuplicateBroker(EndpointId),
    #[error("tried removing a broker for {0} that is not registered")]
    MissingBroker(EndpointId),
}

impl RegistryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::DuplicateBroker(_) => ErrorCode::DuplicateBroker,
            RegistryError::MissingBroker(_) => ErrorCode::MissingBroker,
        }
    }
}

/// Why a broker could not bind to a host structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("{0} does not exist")]
    EndpointMissing(EndpointId),
    #[error("{0} is not a power plant")]
    NotAGenerator(EndpointId),
    #[error("{0} cannot be switched on and off")]
    NotActuatable(EndpointId),
}

/// Invalid operation on the in-memory grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("unknown network {0}")]
    UnknownNetwork(NetworkId),
    #[error("unknown endpoint {0}")]
    UnknownEndpoint(EndpointId),
    #[error("{0} is not a generator")]
    NotAGenerator(EndpointId),
}

/// Failure to encode or decode persisted state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to decode saved state: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("failed to encode state: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to access \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Logs each distinct [`ErrorCode`] once and swallows repeats.
#[derive(Debug, Default)]
pub struct ErrorOnce {
    seen: HashSet<ErrorCode>,
}

impl ErrorOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `err` unless its code has been logged before. Returns whether a
    /// log line was emitted.
    pub fn report(&mut self, err: &RegistryError) -> bool {
        let code = err.code();
        if !self.seen.insert(code) {
            return false;
        }
        error!(code = code.as_u32(), "{err}");
        true
    }

    pub fn has_reported(&self, code: ErrorCode) -> bool {
        self.seen.contains(&code)
    }
}
