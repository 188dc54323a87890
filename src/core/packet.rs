//! # RCON Packet
//!
//! The wire unit of the Source RCON protocol.
//!
//! ## Wire Format
//! ```text
//! [Size(4, LE)] [Id(4, LE)] [Type(4, LE)] [Body(N, UTF-8)] [0x00 0x00]
//! ```
//! `Size` counts everything after itself: `4 + 4 + N + 2`.
//!
//! Decoding never fails. A declared size below [`MIN_DECLARED_SIZE`] yields the
//! empty sentinel packet, and the caller decides what a short frame means.

use crate::error::{ProtocolError, Result};

/// SERVERDATA_AUTH: client asks to authenticate with the body as password
pub const SERVERDATA_AUTH: i32 = 3;

/// SERVERDATA_EXECCOMMAND: client asks to run the body as a command
pub const SERVERDATA_EXECCOMMAND: i32 = 2;

/// SERVERDATA_AUTH_RESPONSE: server answer to an auth request (shares the value 2)
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;

/// SERVERDATA_RESPONSE_VALUE: command output, or a client "more data" request
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Id the server answers with when authentication is refused
pub const AUTH_FAILURE_ID: i32 = -1;

/// Id field + type field + the two terminating NUL bytes
pub const MIN_DECLARED_SIZE: i32 = 10;

/// Length of the size prefix
pub const SIZE_FIELD_LEN: usize = 4;

/// Size prefix + id + type
pub const HEADER_LEN: usize = 12;

const TERMINATOR: [u8; 2] = [0, 0];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub packet_type: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, packet_type: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            packet_type,
            body: body.into(),
        }
    }

    /// Empty-bodied packet, used for acknowledgements and end-of-data markers
    pub fn empty(id: i32, packet_type: i32) -> Self {
        Self::new(id, packet_type, String::new())
    }

    /// The short-frame sentinel `(0, 0, "")`
    pub fn sentinel() -> Self {
        Self::default()
    }

    /// Size field value this packet serializes with
    pub fn declared_size(&self) -> usize {
        self.body.len() + MIN_DECLARED_SIZE as usize
    }

    /// Encoded length including the size prefix
    pub fn wire_len(&self) -> usize {
        self.declared_size() + SIZE_FIELD_LEN
    }

    /// Refuse bodies that the NUL-terminated wire format cannot carry
    pub fn validate(&self) -> Result<()> {
        if self.body.as_bytes().contains(&0) {
            return Err(ProtocolError::InvalidBody);
        }
        Ok(())
    }

    /// Serialize into the RCON wire format.
    ///
    /// Always ends in exactly two NUL bytes regardless of the body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        self.write_into(&mut out);
        out
    }

    pub(crate) fn write_into(&self, out: &mut impl bytes::BufMut) {
        let body = self.body.as_bytes();
        out.put_i32_le(self.declared_size() as i32);
        out.put_i32_le(self.id);
        out.put_i32_le(self.packet_type);
        out.put_slice(body);
        out.put_slice(&TERMINATOR);
    }

    /// Parse a packet from a buffer that starts with the size prefix.
    ///
    /// Frames declaring fewer than [`MIN_DECLARED_SIZE`] bytes, and buffers too
    /// short to hold the id and type, decode to [`Packet::sentinel`]. A body that
    /// runs past the end of the buffer is cut at the buffer end. Trailing NULs
    /// are stripped and invalid UTF-8 is replaced rather than rejected.
    pub fn from_bytes(data: &[u8]) -> Self {
        let Some(declared) = read_i32(data, 0) else {
            return Self::sentinel();
        };
        if declared < MIN_DECLARED_SIZE || data.len() < HEADER_LEN {
            return Self::sentinel();
        }

        let id = read_i32(data, 4).unwrap_or_default();
        let packet_type = read_i32(data, 8).unwrap_or_default();

        let end = (declared as usize + SIZE_FIELD_LEN).min(data.len());
        let body = String::from_utf8_lossy(&data[HEADER_LEN..end])
            .trim_end_matches('\0')
            .to_string();

        Self {
            id,
            packet_type,
            body,
        }
    }
}

/// Little-endian i32 at `offset`, if the buffer is long enough
#[inline]
pub(crate) fn read_i32(data: &[u8], offset: usize) -> Option<i32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
