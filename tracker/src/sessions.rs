//! Turning observed disconnects into persisted session records

use crate::error::TrackerError;
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use log::info;
use shared::{Address, PlayerId, SessionRecord};

/// Builds the record for a session that ran from `connect_time` to
/// `disconnect_time`. Duration is in whole seconds, truncated toward zero.
pub fn materialize(
    address: &Address,
    player_id: &PlayerId,
    connect_time: DateTime<Utc>,
    disconnect_time: DateTime<Utc>,
) -> SessionRecord {
    SessionRecord {
        player_id: player_id.clone(),
        connect_time,
        disconnect_time,
        duration_seconds: (disconnect_time - connect_time).num_seconds(),
        address: address.clone(),
    }
}

/// Appends `record` to the store. The record only counts as committed when
/// this returns `Ok`.
pub async fn persist(store: &dyn SessionStore, record: &SessionRecord) -> Result<(), TrackerError> {
    store.append_session(record).await?;
    info!(
        "Session closed: {} on {} ({}s)",
        record.player_id, record.address, record.duration_seconds
    );
    Ok(())
}
