//! # Remote Console Client
//!
//! Client side of the Source RCON protocol, the administrative TCP channel
//! exposed by Source dedicated servers. The presence tracker uses it to send
//! the `status` command to every tracked server on each poll.
//!
//! ## Module Organization
//!
//! ### Packet Module (`packet`)
//! Wire framing of individual RCON packets:
//! - Little-endian size/id/type header
//! - NUL-terminated bodies with an empty trailing string
//! - Size validation against the protocol limits
//!
//! ### Client Module (`client`)
//! Connection-level behavior built on the packet framing:
//! - Password authentication
//! - Command execution with multi-packet response reassembly
//! - Monotonic request id assignment
//!
//! ## Timeouts
//!
//! The client performs no timing of its own. Callers bound each operation
//! with `tokio::time::timeout`, which drops the connection on expiry.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rcon::RconClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RconClient::connect("127.0.0.1:27015", "password").await?;
//!     let status = client.execute("status").await?;
//!     println!("{}", status);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod packet;

pub use client::RconClient;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection closed by server")]
    ConnectionClosed,
}
