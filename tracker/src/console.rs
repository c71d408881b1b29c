//! Remote console seam between the reconciler and the RCON transport

use crate::error::TrackerError;
use async_trait::async_trait;
use rcon::RconClient;
use shared::{Address, STATUS_COMMAND};
use std::time::Duration;
use tokio::net::TcpStream;

/// Opens administrative sessions to tracked servers
#[async_trait]
pub trait RemoteConsole: Send + Sync {
    async fn connect(&self, address: &Address) -> Result<Box<dyn ConsoleSession>, TrackerError>;
}

/// An authenticated console session
#[async_trait]
pub trait ConsoleSession: Send {
    async fn execute(&mut self, command: &str) -> Result<String, TrackerError>;
}

/// [`RemoteConsole`] backed by Source RCON over TCP
pub struct RconConsole {
    password: String,
    default_port: u16,
}

impl RconConsole {
    pub fn new(password: impl Into<String>, default_port: u16) -> Self {
        Self {
            password: password.into(),
            default_port,
        }
    }
}

#[async_trait]
impl RemoteConsole for RconConsole {
    async fn connect(&self, address: &Address) -> Result<Box<dyn ConsoleSession>, TrackerError> {
        let endpoint = address.endpoint(self.default_port);
        let client = RconClient::connect(&endpoint, &self.password).await?;
        Ok(Box::new(client))
    }
}

#[async_trait]
impl ConsoleSession for RconClient<TcpStream> {
    async fn execute(&mut self, command: &str) -> Result<String, TrackerError> {
        Ok(RconClient::execute(self, command).await?)
    }
}

/// Connects to `address` and runs `status`, giving up after `timeout`.
///
/// A hang anywhere in connect, authentication or the response counts as a
/// failure of this poll only.
pub async fn poll_status(
    console: &dyn RemoteConsole,
    address: &Address,
    timeout: Duration,
) -> Result<String, TrackerError> {
    let poll = async {
        let mut session = console.connect(address).await?;
        session.execute(STATUS_COMMAND).await
    };

    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| TrackerError::Timeout {
            address: address.clone(),
            timeout,
        })?
}
