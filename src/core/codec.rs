//! # Packet Codec
//!
//! Tokio codec framing RCON packets over a byte stream.
//!
//! TCP does not preserve message boundaries, so the decoder reads the declared
//! size and waits until the whole frame is buffered before handing it to
//! [`Packet::from_bytes`]. A declared size below the protocol minimum produces
//! [`Frame::Malformed`] instead of an error so the session can close cleanly.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::config::MAX_PACKET_SIZE;
use crate::core::packet::{read_i32, Packet, MIN_DECLARED_SIZE, SIZE_FIELD_LEN};
use crate::error::{ProtocolError, Result};

/// One inbound unit as seen by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Packet(Packet),
    /// Declared size below the protocol minimum; the connection is idle or garbage
    Malformed { declared_size: i32 },
}

#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    /// Largest accepted frame, size prefix included
    max_frame_size: usize,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(MAX_PACKET_SIZE)
    }
}

impl PacketCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Decoder for PacketCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some(declared) = read_i32(&src[..], 0) else {
            return Ok(None);
        };

        if declared < MIN_DECLARED_SIZE {
            // Nothing after a bogus size prefix can be trusted
            src.clear();
            return Ok(Some(Frame::Malformed {
                declared_size: declared,
            }));
        }

        let frame_len = declared as usize + SIZE_FIELD_LEN;
        if frame_len > self.max_frame_size {
            warn!(
                declared_size = declared,
                max = self.max_frame_size,
                "Rejecting oversized RCON frame"
            );
            return Err(ProtocolError::OversizedPacket(frame_len));
        }

        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        Ok(Some(Frame::Packet(Packet::from_bytes(&frame))))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        item.validate()?;
        dst.reserve(item.wire_len());
        item.write_into(dst);
        Ok(())
    }
}
