//! RCON packet model and wire codec shared by the client and the tooling.
//!
//! Every frame on the wire is:
//!
//! ```text
//! int32 LE length | int32 LE request id | int32 LE type | body (UTF-8) | 0x00 0x00
//! ```
//!
//! where `length` counts everything after the length field itself, i.e.
//! `body.len() + 10`.

/// Outgoing authentication request
pub const SERVERDATA_AUTH: i32 = 3;
/// Incoming authentication result
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
/// Outgoing console command (same numeric value as the auth response)
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
/// Incoming plain command output
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Request id the server puts in any reply that rejects the password
pub const AUTH_FAILED_ID: i32 = -1;

/// Size of the little-endian length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;
/// Request id + type + the two trailing NUL bytes
pub const PACKET_OVERHEAD: usize = 10;
/// Upper bound on a declared payload length accepted from the peer
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("Frame length {0} is outside the accepted range")]
    InvalidLength(i64),

    #[error("Frame truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// A single RCON packet.
///
/// `kind` stays a raw integer because the protocol reuses the value `2` for
/// both the auth response and the exec command depending on direction.
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

    /// Builds the authentication request carrying the password
    pub fn auth(id: i32, password: &str) -> Self {
        Self::new(id, SERVERDATA_AUTH, password)
    }

    /// Builds a console command request
    pub fn exec(id: i32, command: &str) -> Self {
        Self::new(id, SERVERDATA_EXECCOMMAND, command)
    }

    /// True when the server used the reserved id that signals a bad password
    pub fn is_auth_rejection(&self) -> bool {
        self.id == AUTH_FAILED_ID
    }

    /// True for the packet types a command reply may carry
    pub fn is_command_response(&self) -> bool {
        self.kind == SERVERDATA_RESPONSE_VALUE || self.kind == SERVERDATA_AUTH_RESPONSE
    }

    /// Serializes the packet into a complete frame including the length prefix
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let length = (body.len() + PACKET_OVERHEAD) as i32;

        let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + body.len() + PACKET_OVERHEAD);
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&self.id.to_le_bytes());
        frame.extend_from_slice(&self.kind.to_le_bytes());
        frame.extend_from_slice(body);
        frame.extend_from_slice(&[0, 0]);
        frame
    }

    /// Decodes the payload that follows the length prefix.
    ///
    /// The body is everything between the header and the two trailing bytes;
    /// invalid UTF-8 is replaced rather than rejected.
    pub fn decode_payload(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() < PACKET_OVERHEAD {
            return Err(PacketError::Truncated {
                expected: PACKET_OVERHEAD,
                actual: payload.len(),
            });
        }

        let id = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let kind = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
        let body = String::from_utf8_lossy(&payload[8..payload.len() - 2]).into_owned();

        Ok(Self { id, kind, body })
    }

    /// Decodes one complete frame, returning the packet and the bytes consumed
    pub fn decode(frame: &[u8]) -> Result<(Self, usize), PacketError> {
        if frame.len() < LENGTH_PREFIX_SIZE {
            return Err(PacketError::Truncated {
                expected: LENGTH_PREFIX_SIZE,
                actual: frame.len(),
            });
        }

        let length = payload_length([frame[0], frame[1], frame[2], frame[3]])?;
        let end = LENGTH_PREFIX_SIZE + length;
        if frame.len() < end {
            return Err(PacketError::Truncated {
                expected: end,
                actual: frame.len(),
            });
        }

        let packet = Self::decode_payload(&frame[LENGTH_PREFIX_SIZE..end])?;
        Ok((packet, end))
    }
}

/// Validates a length prefix and returns the number of payload bytes to read
pub fn payload_length(prefix: [u8; LENGTH_PREFIX_SIZE]) -> Result<usize, PacketError> {
    let declared = i32::from_le_bytes(prefix);
    if declared < PACKET_OVERHEAD as i32 || declared as usize > MAX_PAYLOAD_SIZE {
        return Err(PacketError::InvalidLength(declared as i64));
    }
    Ok(declared as usize)
}
