//! TCP client side of the RCON protocol.
//!
//! Used by integration tests and tooling to talk to a running server.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

use crate::core::codec::{Frame, PacketCodec};
use crate::core::packet::{
    Packet, AUTH_FAILURE_ID, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE,
    SERVERDATA_EXECCOMMAND, SERVERDATA_RESPONSE_VALUE,
};
use crate::error::{ProtocolError, Result};

/// Largest frame a client accepts. Server frames may exceed the inbound
/// server limit when a full response chunk is sent.
pub const CLIENT_MAX_FRAME: usize = 1024 * 1024;

/// Open a framed connection to an RCON server
#[instrument]
pub async fn connect(addr: SocketAddr) -> Result<Framed<TcpStream, PacketCodec>> {
    let stream = TcpStream::connect(addr).await?;
    Ok(Framed::new(stream, PacketCodec::new(CLIENT_MAX_FRAME)))
}

/// Minimal RCON client
pub struct RconClient {
    framed: Framed<TcpStream, PacketCodec>,
    next_id: i32,
}

impl RconClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Ok(Self {
            framed: connect(addr).await?,
            next_id: 1,
        })
    }

    fn take_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    pub async fn send(&mut self, packet: Packet) -> Result<()> {
        self.framed.send(packet).await
    }

    /// Next packet from the server. A closed connection is [`ProtocolError::ConnectionClosed`].
    pub async fn recv(&mut self) -> Result<Packet> {
        match self.framed.next().await {
            Some(Ok(Frame::Packet(packet))) => Ok(packet),
            Some(Ok(Frame::Malformed { .. })) => Err(ProtocolError::InvalidBody),
            Some(Err(e)) => Err(e),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }

    /// Log in. The server answers with an empty value packet and then the
    /// auth response; an id of -1 on the latter means the password was refused.
    pub async fn authenticate(&mut self, password: &str) -> Result<()> {
        let id = self.take_id();
        self.send(Packet::new(id, SERVERDATA_AUTH, password)).await?;

        let _ack = self.recv().await?;
        let response = self.recv().await?;
        if response.packet_type != SERVERDATA_AUTH_RESPONSE || response.id == AUTH_FAILURE_ID {
            return Err(ProtocolError::AuthenticationFailed);
        }
        debug!(id, "Authenticated");
        Ok(())
    }

    /// Run a command and collect its whole output.
    ///
    /// Asks for further chunks with empty value packets until the server
    /// answers one of those with an empty packet of its own.
    pub async fn execute(&mut self, command: &str) -> Result<String> {
        let id = self.take_id();
        self.send(Packet::new(id, SERVERDATA_EXECCOMMAND, command)).await?;

        let first = self.recv().await?;
        if first.id == AUTH_FAILURE_ID {
            return Err(ProtocolError::AuthenticationFailed);
        }
        let mut output = first.body;

        let marker = self.take_id();
        loop {
            self.send(Packet::empty(marker, SERVERDATA_RESPONSE_VALUE))
                .await?;
            let packet = self.recv().await?;
            if packet.id == marker && packet.body.is_empty() {
                break;
            }
            output.push_str(&packet.body);
        }
        Ok(output)
    }

    pub fn into_inner(self) -> Framed<TcpStream, PacketCodec> {
        self.framed
    }
}
