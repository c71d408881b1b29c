//! Per-server rosters and the presence diff
//!
//! The servers never report when a player joined, so a roster maps each
//! player id to the first instant the tracker saw it present. Comparing the
//! roster against the ids in the latest observation is the only way connects
//! and disconnects are detected.

use chrono::{DateTime, Duration, Utc};
use shared::{Address, PlayerId, SessionRecord};
use std::collections::{HashMap, HashSet};

/// Player id to first-observed instant, for one server
pub type Roster = HashMap<PlayerId, DateTime<Utc>>;

/// Result of comparing a roster with a fresh observation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RosterDiff {
    /// Present now, not tracked before
    pub connected: HashSet<PlayerId>,
    /// Tracked before, absent now, with time elapsed since first seen
    pub disconnected: HashMap<PlayerId, Duration>,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.connected.is_empty() && self.disconnected.is_empty()
    }
}

/// Classifies every id of `previous` and `current`.
///
/// Ids present in both are left out of the diff entirely: their connect
/// instant is never refreshed. Elapsed durations are `now - connected_at`
/// and go negative if the clock moved backwards.
pub fn diff(previous: &Roster, current: &HashSet<PlayerId>, now: DateTime<Utc>) -> RosterDiff {
    let connected = current
        .iter()
        .filter(|id| !previous.contains_key(*id))
        .cloned()
        .collect();

    let disconnected = previous
        .iter()
        .filter(|(id, _)| !current.contains(*id))
        .map(|(id, connected_at)| (id.clone(), now - *connected_at))
        .collect();

    RosterDiff {
        connected,
        disconnected,
    }
}

/// Reachability of a tracked server as seen by the poller
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Never polled successfully or unsuccessfully yet
    #[default]
    Unpolled,
    /// Last poll succeeded
    Live,
    /// Last poll failed; roster is frozen until the server answers again
    Unreachable,
}

/// Everything the tracker remembers about one server between polls
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServerTrack {
    pub state: TrackState,
    pub roster: Roster,
    /// Sessions already closed whose write to the session store failed.
    /// They stay here, in order, until a write succeeds.
    pub unsaved: Vec<SessionRecord>,
}

/// Per-server tracking state, keyed by address.
///
/// A pass moves each server's track out with [`RosterTable::take`] and hands
/// it to the task polling that server, then puts it back with
/// [`RosterTable::restore`]. While a track is checked out nothing else can
/// reach it.
///
/// Tracks are never evicted: an address dropped from the registry keeps its
/// track and resumes from it if it is listed again.
#[derive(Debug, Default)]
pub struct RosterTable {
    tracks: HashMap<Address, ServerTrack>,
}

impl RosterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the track for `address`, or a fresh one
    pub fn take(&mut self, address: &Address) -> ServerTrack {
        self.tracks.remove(address).unwrap_or_default()
    }

    pub fn restore(&mut self, address: Address, track: ServerTrack) {
        self.tracks.insert(address, track);
    }

    pub fn get(&self, address: &Address) -> Option<&ServerTrack> {
        self.tracks.get(address)
    }

    /// Total number of players tracked across all servers
    pub fn tracked_players(&self) -> usize {
        self.tracks.values().map(|track| track.roster.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
