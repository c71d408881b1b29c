//! Authenticated RCON connection and command execution

use crate::packet::{
    read_packet, write_packet, Packet, AUTH_FAILED_ID, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE,
    SERVERDATA_EXECCOMMAND, SERVERDATA_RESPONSE_VALUE,
};
use crate::RconError;
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// A single RCON connection.
///
/// Generic over the underlying stream so the protocol logic can be driven
/// by a TCP socket in production and by an in-memory mock in tests.
#[derive(Debug)]
pub struct RconClient<S = TcpStream> {
    stream: S,
    next_id: i32,
}

impl RconClient<TcpStream> {
    /// Opens a TCP connection to `endpoint` (`host:port`) and authenticates
    pub async fn connect(endpoint: &str, password: &str) -> Result<Self, RconError> {
        let stream = TcpStream::connect(endpoint).await?;
        stream.set_nodelay(true)?;

        let mut client = Self::from_stream(stream);
        client.authenticate(password).await?;

        info!("RCON session established with {}", endpoint);
        Ok(client)
    }
}

impl<S> RconClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already-open stream. The caller must authenticate before
    /// executing commands.
    pub fn from_stream(stream: S) -> Self {
        Self { stream, next_id: 1 }
    }

    fn next_id(&mut self) -> i32 {
        let id = self.next_id;
        // Ids stay positive so they can never collide with AUTH_FAILED_ID
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }

    /// Sends the password and waits for the server's verdict
    pub async fn authenticate(&mut self, password: &str) -> Result<(), RconError> {
        let id = self.next_id();
        write_packet(&mut self.stream, &Packet::new(id, SERVERDATA_AUTH, password)).await?;

        loop {
            let packet = read_packet(&mut self.stream).await?;
            match packet.kind {
                SERVERDATA_AUTH_RESPONSE if packet.id == AUTH_FAILED_ID => {
                    return Err(RconError::AuthFailed)
                }
                SERVERDATA_AUTH_RESPONSE if packet.id == id => return Ok(()),
                SERVERDATA_AUTH_RESPONSE => {
                    return Err(RconError::Protocol(format!(
                        "auth response for unknown request id {}",
                        packet.id
                    )))
                }
                // Source servers send an empty value packet ahead of the verdict
                _ => debug!("Skipping pre-auth packet id={}", packet.id),
            }
        }
    }

    /// Runs a console command and returns its full textual response.
    ///
    /// Responses larger than one packet are split by the server, so an empty
    /// sentinel request follows the command; its echo marks the end of the
    /// command's output.
    pub async fn execute(&mut self, command: &str) -> Result<String, RconError> {
        let command_id = self.next_id();
        let sentinel_id = self.next_id();

        write_packet(
            &mut self.stream,
            &Packet::new(command_id, SERVERDATA_EXECCOMMAND, command),
        )
        .await?;
        write_packet(
            &mut self.stream,
            &Packet::new(sentinel_id, SERVERDATA_RESPONSE_VALUE, ""),
        )
        .await?;

        let mut response = String::new();
        loop {
            let packet = read_packet(&mut self.stream).await?;
            if packet.id == command_id {
                response.push_str(&packet.body);
            } else if packet.id == sentinel_id {
                break;
            } else {
                debug!("Skipping stray packet id={}", packet.id);
            }
        }

        Ok(response)
    }
}
