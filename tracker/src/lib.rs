//! # Presence Tracker Library
//!
//! This library keeps a live status snapshot for a fleet of remote game
//! servers and derives player sessions purely from presence. The servers never
//! announce connects or disconnects; the tracker polls each one over RCON,
//! reads who is present, and compares that with what it saw last time.
//!
//! ## Core Responsibilities
//!
//! ### Live Status
//! Every successful poll overwrites the server's hostname, map and player
//! counts in the registry. A failed poll leaves the last known values in place.
//!
//! ### Session Derivation
//! A player's connect instant is the first time the tracker saw them present.
//! When a tracked player is missing from a later poll, a session record with
//! connect time, disconnect time and duration is appended to the session store.
//!
//! ### Outage Tolerance
//! An unreachable server freezes its roster. Nobody is disconnected because of
//! a network blip; real disconnects during the outage are detected once the
//! server answers again.
//!
//! ## Module Organization
//!
//! ### Parser Module (`parser`)
//! Pattern-based extraction from the `status` response:
//! - Hostname, map, player and max player counts
//! - Every platform account id present
//! - Per-field fallback to empty values, never a hard failure
//!
//! ### Roster Module (`roster`)
//! Presence bookkeeping:
//! - The pure diff of a roster against a fresh observation
//! - Per-server tracking state and reachability
//! - The address-keyed table owning all of it
//!
//! ### Sessions Module (`sessions`)
//! Record construction and commit through the session store.
//!
//! ### Reconciler Module (`reconciler`)
//! One pass over all servers: poll, parse, update status, diff, persist.
//!
//! ### Scheduler Module (`scheduler`)
//! Fixed-interval passes with an explicit shutdown signal.
//!
//! ### Collaborators (`store`, `console`, `clock`)
//! Traits the reconciler depends on, with in-memory, JSON Lines, RCON and
//! system clock implementations.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tracker::clock::SystemClock;
//! use tracker::console::RconConsole;
//! use tracker::reconciler::Reconciler;
//! use tracker::scheduler::Scheduler;
//! use tracker::store::{JsonlSessionStore, MemoryRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(MemoryRegistry::new(vec!["10.0.0.5".into()]));
//!     let sessions = Arc::new(JsonlSessionStore::open("./data/sessions.jsonl").await?);
//!     let console = Arc::new(RconConsole::new("password", 27015));
//!
//!     let reconciler = Reconciler::new(registry, sessions, console, Arc::new(SystemClock));
//!     let mut scheduler = Scheduler::new(reconciler, Duration::from_secs(30));
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     scheduler.run(shutdown_rx).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Restarts
//!
//! Rosters live only in memory. Players connected across a restart are seen
//! as new connections afterwards and their earlier time is not recorded.

pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod parser;
pub mod reconciler;
pub mod roster;
pub mod scheduler;
pub mod sessions;
pub mod store;

pub use error::TrackerError;
