//! Tracker error types

use rcon::RconError;
use shared::Address;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Remote console error: {0}")]
    Console(#[from] RconError),

    #[error("Poll of {address} timed out after {timeout:?}")]
    Timeout { address: Address, timeout: Duration },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
