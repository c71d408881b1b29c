use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Port the Source dedicated server listens on for RCON when none is given
pub const DEFAULT_RCON_PORT: u16 = 27015;

/// Console command whose response carries hostname, map, counts and roster
pub const STATUS_COMMAND: &str = "status";

/// Opaque platform account token, e.g. `U:1:12345678`
pub type PlayerId = String;

/// Network endpoint identifying one tracked game server.
///
/// Stored exactly as registered (`host` or `host:port`); it is the identity
/// key for every piece of per-server state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a connectable `host:port`, filling in `default_port` when the
    /// address carries no port of its own.
    pub fn endpoint(&self, default_port: u16) -> String {
        if let Ok(addr) = self.0.parse::<SocketAddr>() {
            return addr.to_string();
        }
        if let Ok(ip) = self.0.parse::<IpAddr>() {
            return SocketAddr::new(ip, default_port).to_string();
        }
        match self.0.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => self.0.clone(),
            _ => format!("{}:{}", self.0, default_port),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

/// Latest observed status of one server. Overwritten on every successful poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub address: Address,
    pub hostname: String,
    pub map: String,
    pub players: u32,
    pub max_players: u32,
}

/// One completed player session, derived from presence observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub player_id: PlayerId,
    pub connect_time: DateTime<Utc>,
    pub disconnect_time: DateTime<Utc>,
    /// Whole seconds between connect and disconnect, truncated toward zero
    pub duration_seconds: i64,
    pub address: Address,
}
