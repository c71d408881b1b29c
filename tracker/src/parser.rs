//! Extraction of structured fields from a `status` console response
//!
//! The response is free-form text meant for humans. Every field is matched
//! independently, and a field whose line is missing or malformed falls back
//! to an empty string or zero without affecting the others. Parsing never
//! fails; a response with nothing recognizable yields an empty status.
//!
//! A typical response looks like:
//!
//! ```text
//! hostname: upfast.tf | US West #1
//! version : 8835751/24 8835751 secure
//! map     : cp_badlands at: 0 x, 0 y, 0 z
//! players : 2 humans, 0 bots (24 max)
//! # userid name       uniqueid       connected ping loss state  adr
//! #      2 "alice"    [U:1:111111]   12:34       45    0 active 1.2.3.4:27005
//! #      3 "bob"      [U:1:222222]   05:01       60    0 active 5.6.7.8:27005
//! ```

use regex::Regex;
use shared::{Address, LiveStatus, PlayerId};
use std::collections::HashSet;
use std::sync::LazyLock;

static HOSTNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"hostname:\s*(.+)").expect("valid hostname pattern"));

static MAP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"map\s*:\s*([^\s]+)").expect("valid map pattern"));

static PLAYERS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"players\s*:\s*(\d+)\s*humans.*\((\d+)\s*max\)").expect("valid players pattern")
});

static PLAYER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"U:1:\d+").expect("valid player id pattern"));

/// Fields recovered from one `status` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStatus {
    pub hostname: String,
    pub map: String,
    pub players: u32,
    pub max_players: u32,
    /// Every player id occurrence in response order, duplicates included
    pub player_ids: Vec<PlayerId>,
}

impl ParsedStatus {
    /// Distinct player ids currently present
    pub fn roster(&self) -> HashSet<PlayerId> {
        self.player_ids.iter().cloned().collect()
    }

    pub fn live_status(&self, address: &Address) -> LiveStatus {
        LiveStatus {
            address: address.clone(),
            hostname: self.hostname.clone(),
            map: self.map.clone(),
            players: self.players,
            max_players: self.max_players,
        }
    }
}

/// Parses a raw `status` response
pub fn parse_status(raw: &str) -> ParsedStatus {
    let hostname = HOSTNAME_PATTERN
        .captures(raw)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default();

    let map = MAP_PATTERN
        .captures(raw)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();

    let (players, max_players) = PLAYERS_PATTERN
        .captures(raw)
        .map(|caps| (parse_count(&caps[1]), parse_count(&caps[2])))
        .unwrap_or_default();

    let player_ids = PLAYER_ID_PATTERN
        .find_iter(raw)
        .map(|m| m.as_str().to_string())
        .collect();

    ParsedStatus {
        hostname,
        map,
        players,
        max_players,
        player_ids,
    }
}

// Digit runs too long for u32 count as a miss
fn parse_count(digits: &str) -> u32 {
    digits.parse().unwrap_or(0)
}
