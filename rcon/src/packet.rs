//! Source RCON packet framing
//!
//! Every packet on the wire is laid out as little-endian fields:
//!
//! ```text
//! size: i32 | id: i32 | type: i32 | body bytes | 0x00 | 0x00
//! ```
//!
//! `size` counts everything after itself, so an empty body gives a size of 10.

use crate::RconError;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Smallest legal size field: id + type + two terminators
pub const MIN_PACKET_SIZE: i32 = 10;
/// Largest size field the protocol allows
pub const MAX_PACKET_SIZE: i32 = 4096;

/// Id the server answers an auth request with when the password is wrong
pub const AUTH_FAILED_ID: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Encodes the packet into its wire representation
    pub fn encode(&self) -> Result<Vec<u8>, RconError> {
        let body = self.body.as_bytes();
        let size = i32::try_from(body.len())
            .ok()
            .and_then(|len| len.checked_add(MIN_PACKET_SIZE))
            .filter(|size| *size <= MAX_PACKET_SIZE)
            .ok_or_else(|| {
                RconError::Protocol(format!("body of {} bytes is too large", body.len()))
            })?;

        let mut data = Vec::with_capacity(size as usize + 4);
        data.extend_from_slice(&size.to_le_bytes());
        data.extend_from_slice(&self.id.to_le_bytes());
        data.extend_from_slice(&self.kind.to_le_bytes());
        data.extend_from_slice(body);
        data.extend_from_slice(&[0, 0]);
        Ok(data)
    }
}

/// Writes one packet and flushes the stream
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), RconError>
where
    W: AsyncWrite + Unpin,
{
    let data = packet.encode()?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    debug!(
        "Sent packet id={} type={} ({} bytes)",
        packet.id,
        packet.kind,
        data.len()
    );
    Ok(())
}

/// Reads exactly one packet from the stream.
///
/// A clean end of stream before the size field is reported as
/// [`RconError::ConnectionClosed`]; a size outside the legal range is a
/// protocol error and leaves the stream unusable.
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, RconError>
where
    R: AsyncRead + Unpin,
{
    let size = match reader.read_i32_le().await {
        Ok(size) => size,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(RconError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };

    if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&size) {
        return Err(RconError::Protocol(format!("invalid packet size {}", size)));
    }

    let id = reader.read_i32_le().await?;
    let kind = reader.read_i32_le().await?;

    let mut payload = vec![0u8; (size - 8) as usize];
    reader.read_exact(&mut payload).await?;

    // Body ends at the first terminator; the trailing empty string is padding
    let end = payload.iter().position(|b| *b == 0).unwrap_or(payload.len());
    let body = String::from_utf8_lossy(&payload[..end]).into_owned();

    debug!("Received packet id={} type={} ({} body bytes)", id, kind, end);
    Ok(Packet { id, kind, body })
}
