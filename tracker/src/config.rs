//! Runtime configuration of the tracker daemon

use crate::error::TrackerError;
use crate::store::{MemoryRegistry, ServerRegistry};
use shared::{Address, DEFAULT_RCON_PORT};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SESSIONS_FILE: &str = "./data/sessions.jsonl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub rcon_password: String,
    pub rcon_port: u16,
    pub sessions_file: PathBuf,
    /// Re-read every poll interval when set
    pub servers_file: Option<PathBuf>,
    pub servers: Vec<Address>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            rcon_password: String::new(),
            rcon_port: DEFAULT_RCON_PORT,
            sessions_file: PathBuf::from(DEFAULT_SESSIONS_FILE),
            servers_file: None,
            servers: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Checks value ranges and drops servers naming an endpoint already
    /// listed, keeping the first occurrence of each
    pub fn validate(mut self) -> Result<Self, TrackerError> {
        if self.poll_interval.is_zero() {
            return Err(TrackerError::Config(
                "poll interval must be at least one second".to_string(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(TrackerError::Config(
                "poll timeout must be at least one second".to_string(),
            ));
        }

        let port = self.rcon_port;
        let mut seen = HashSet::new();
        self.servers.retain(|address| {
            !address.as_str().is_empty() && seen.insert(address.endpoint(port))
        });
        Ok(self)
    }
}

/// Reads a JSON array of server addresses, e.g. `["10.0.0.5", "10.0.0.6:27016"]`
pub fn load_servers_file(path: &Path) -> Result<Vec<Address>, TrackerError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
    let servers: Vec<Address> = serde_json::from_str(&contents)?;
    Ok(servers)
}

/// Registers every address in `path` whose endpoint the registry does not
/// track yet. Returns how many were added.
pub async fn register_new_servers(
    registry: &MemoryRegistry,
    path: &Path,
    default_port: u16,
) -> Result<usize, TrackerError> {
    let listed = load_servers_file(path)?;
    let mut known: HashSet<String> = registry
        .tracked_addresses()
        .await?
        .iter()
        .map(|address| address.endpoint(default_port))
        .collect();

    let mut added = 0;
    for address in listed {
        if address.as_str().is_empty() || !known.insert(address.endpoint(default_port)) {
            continue;
        }
        if registry.register(address).await {
            added += 1;
        }
    }
    Ok(added)
}
