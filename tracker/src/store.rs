//! Server registry and session store
//!
//! The tracker only depends on the two traits defined here. Implementations
//! must serialize their own writes; the tracker issues at most one live
//! status write per server per pass.

use crate::error::TrackerError;
use async_trait::async_trait;
use log::info;
use shared::{Address, LiveStatus, SessionRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

/// Source of tracked servers and sink for their live status
#[async_trait]
pub trait ServerRegistry: Send + Sync {
    /// Addresses to poll on the next pass
    async fn tracked_addresses(&self) -> Result<Vec<Address>, TrackerError>;

    /// Replaces the stored status for `status.address`
    async fn upsert_live_status(&self, status: &LiveStatus) -> Result<(), TrackerError>;
}

/// Append-only sink for completed sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append_session(&self, record: &SessionRecord) -> Result<(), TrackerError>;
}

/// In-process registry. Also answers read-only status queries.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    addresses: RwLock<Vec<Address>>,
    statuses: RwLock<HashMap<Address, LiveStatus>>,
}

impl MemoryRegistry {
    pub fn new(addresses: Vec<Address>) -> Self {
        Self {
            addresses: RwLock::new(addresses),
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// Starts tracking `address`. Returns false if it was already tracked.
    pub async fn register(&self, address: Address) -> bool {
        let mut addresses = self.addresses.write().await;
        if addresses.contains(&address) {
            return false;
        }
        info!("Registered server {}", address);
        addresses.push(address);
        true
    }

    pub async fn status(&self, address: &Address) -> Option<LiveStatus> {
        self.statuses.read().await.get(address).cloned()
    }

    /// Latest status of every server that has answered at least once,
    /// sorted by address
    pub async fn statuses(&self) -> Vec<LiveStatus> {
        let mut statuses: Vec<LiveStatus> = self.statuses.read().await.values().cloned().collect();
        statuses.sort_by(|a, b| a.address.cmp(&b.address));
        statuses
    }
}

#[async_trait]
impl ServerRegistry for MemoryRegistry {
    async fn tracked_addresses(&self) -> Result<Vec<Address>, TrackerError> {
        Ok(self.addresses.read().await.clone())
    }

    async fn upsert_live_status(&self, status: &LiveStatus) -> Result<(), TrackerError> {
        self.statuses
            .write()
            .await
            .insert(status.address.clone(), status.clone());
        Ok(())
    }
}

/// Session store that keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: Mutex<Vec<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn append_session(&self, record: &SessionRecord) -> Result<(), TrackerError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

/// Session store writing one JSON object per line
#[derive(Debug)]
pub struct JsonlSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSessionStore {
    /// Prepares `path` for appending, creating parent directories as needed
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        info!("Writing sessions to {}", path.display());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for JsonlSessionStore {
    async fn append_session(&self, record: &SessionRecord) -> Result<(), TrackerError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| TrackerError::Store(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| TrackerError::Store(format!("{}: {}", self.path.display(), e)))?;
        file.flush().await?;
        Ok(())
    }
}
