//! Poll → parse → diff → persist, for every tracked server
//!
//! Each pass polls all tracked servers concurrently. A server's
//! [`ServerTrack`] is moved into the task that polls it and moved back when
//! the task ends, so a roster is only ever touched by one task at a time.
//!
//! Failure handling per server:
//! - A poll that cannot connect, authenticate, or answer in time marks the
//!   server unreachable and leaves its roster and live status exactly as
//!   they were. Sessions are neither opened nor closed during an outage.
//! - A failed live status write is logged; roster diffing still happens.
//! - A disconnect closes the session at the instant the player was first
//!   seen absent. If writing the record fails, the record stays on the
//!   server's track and is retried every pass until it is written, even if
//!   the player has come back and started a new session in the meantime.
//!
//! No failure on one server affects the others in the same pass.

use crate::clock::Clock;
use crate::console::{poll_status, RemoteConsole};
use crate::error::TrackerError;
use crate::parser::parse_status;
use crate::roster::{self, RosterTable, ServerTrack, TrackState};
use crate::sessions;
use crate::store::{ServerRegistry, SessionStore};
use log::{debug, error, info, warn};
use shared::Address;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to one server during a pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub reachable: bool,
    pub connected: usize,
    pub disconnected: usize,
    pub persist_failures: usize,
    pub registry_failed: bool,
}

/// Totals for one pass over all tracked servers
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub polled: usize,
    pub live: usize,
    pub unreachable: usize,
    pub connected: usize,
    pub disconnected: usize,
    pub persist_failures: usize,
    pub registry_failures: usize,
}

impl PassReport {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.polled += 1;
        if outcome.reachable {
            self.live += 1;
        } else {
            self.unreachable += 1;
        }
        self.connected += outcome.connected;
        self.disconnected += outcome.disconnected;
        self.persist_failures += outcome.persist_failures;
        if outcome.registry_failed {
            self.registry_failures += 1;
        }
    }
}

/// Collaborators shared by every per-server task of a pass
#[derive(Clone)]
struct CycleContext {
    registry: Arc<dyn ServerRegistry>,
    sessions: Arc<dyn SessionStore>,
    console: Arc<dyn RemoteConsole>,
    clock: Arc<dyn Clock>,
    poll_timeout: Duration,
}

pub struct Reconciler {
    context: CycleContext,
    table: RosterTable,
}

impl Reconciler {
    pub fn new(
        registry: Arc<dyn ServerRegistry>,
        sessions: Arc<dyn SessionStore>,
        console: Arc<dyn RemoteConsole>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            context: CycleContext {
                registry,
                sessions,
                console,
                clock,
                poll_timeout: DEFAULT_POLL_TIMEOUT,
            },
            table: RosterTable::new(),
        }
    }

    /// Bounds connect + `status` for each server
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.context.poll_timeout = poll_timeout;
        self
    }

    /// Starts from existing tracking state instead of an empty table
    pub fn with_table(mut self, table: RosterTable) -> Self {
        self.table = table;
        self
    }

    pub fn table(&self) -> &RosterTable {
        &self.table
    }

    /// Runs one pass over every tracked server.
    ///
    /// Only a failure to list the tracked servers aborts the pass; every
    /// per-server failure is contained and counted in the report.
    pub async fn run_pass(&mut self) -> Result<PassReport, TrackerError> {
        let addresses = self.context.registry.tracked_addresses().await?;

        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();
        for address in addresses {
            if !seen.insert(address.clone()) {
                continue;
            }
            let track = self.table.take(&address);
            let context = self.context.clone();
            tasks.spawn(reconcile_server(context, address, track));
        }

        let mut report = PassReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((address, track, outcome)) => {
                    self.table.restore(address, track);
                    report.record(&outcome);
                }
                // The track went down with the task; its players will be
                // picked up again as new connections
                Err(e) => error!(
                    "Poll task failed: {}; open and unsaved sessions of that server are lost",
                    e
                ),
            }
        }

        info!(
            "Pass complete: {} polled, {} live, {} unreachable, +{} -{} players, {} unsaved sessions",
            report.polled,
            report.live,
            report.unreachable,
            report.connected,
            report.disconnected,
            report.persist_failures
        );
        Ok(report)
    }
}

/// Writes every closed session held by `track`, oldest first. Records whose
/// write fails stay on the track for the next cycle.
async fn save_closed_sessions(
    context: &CycleContext,
    address: &Address,
    track: &mut ServerTrack,
    outcome: &mut CycleOutcome,
) {
    for record in std::mem::take(&mut track.unsaved) {
        match sessions::persist(context.sessions.as_ref(), &record).await {
            Ok(()) => outcome.disconnected += 1,
            Err(e) => {
                error!(
                    "Failed to save session of {} on {}: {}; retrying next cycle",
                    record.player_id, address, e
                );
                outcome.persist_failures += 1;
                track.unsaved.push(record);
            }
        }
    }
}

/// One poll cycle for one server, strictly ordered:
/// poll → parse → live status → diff → persist
async fn reconcile_server(
    context: CycleContext,
    address: Address,
    mut track: ServerTrack,
) -> (Address, ServerTrack, CycleOutcome) {
    let mut outcome = CycleOutcome::default();

    let raw = match poll_status(context.console.as_ref(), &address, context.poll_timeout).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to poll {}: {}", address, e);
            if track.state != TrackState::Unreachable {
                info!("{} is unreachable ({:?} -> Unreachable)", address, track.state);
            }
            track.state = TrackState::Unreachable;
            save_closed_sessions(&context, &address, &mut track, &mut outcome).await;
            return (address, track, outcome);
        }
    };
    outcome.reachable = true;

    let parsed = parse_status(&raw);
    let now = context.clock.now();
    debug!(
        "{}: hostname={:?} map={:?} players={}/{} ids={}",
        address,
        parsed.hostname,
        parsed.map,
        parsed.players,
        parsed.max_players,
        parsed.player_ids.len()
    );

    if track.state != TrackState::Live {
        info!("{} is live ({:?} -> Live)", address, track.state);
    }
    track.state = TrackState::Live;

    if let Err(e) = context
        .registry
        .upsert_live_status(&parsed.live_status(&address))
        .await
    {
        warn!("Failed to update live status for {}: {}", address, e);
        outcome.registry_failed = true;
    }

    let current = parsed.roster();
    let diff = roster::diff(&track.roster, &current, now);

    for player_id in diff.connected {
        info!("Player {} connected to {}", player_id, address);
        track.roster.insert(player_id, now);
        outcome.connected += 1;
    }

    for (player_id, elapsed) in diff.disconnected {
        let Some(connect_time) = track.roster.remove(&player_id) else {
            continue;
        };
        debug!(
            "Player {} left {} after {}s",
            player_id,
            address,
            elapsed.num_seconds()
        );
        track
            .unsaved
            .push(sessions::materialize(&address, &player_id, connect_time, now));
    }

    save_closed_sessions(&context, &address, &mut track, &mut outcome).await;
    (address, track, outcome)
}
