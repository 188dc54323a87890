//! Per-connection RCON state machine.
//!
//! ```text
//! AwaitingAuth --auth ok--> Authenticated --bad auth--> Closed
//!      |                                                  ^
//!      +---------------- bad auth / anything else --------+
//! ```
//!
//! Transitions are pure: [`ConnectionState::on_packet`] returns a [`Step`]
//! telling the session what to write and whether to close. Command execution
//! is the one effect left to the caller, which reports the status text back
//! through [`ConnectionState::complete`].
//!
//! Multi-packet replies: the first chunk goes out with the command answer, the
//! rest wait in `pending` and are handed out one per `SERVERDATA_RESPONSE_VALUE`
//! request. Once drained, the next such request gets an empty packet.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::config::RESPONSE_CHUNK_SIZE;
use crate::core::packet::{
    Packet, AUTH_FAILURE_ID, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE, SERVERDATA_EXECCOMMAND,
    SERVERDATA_RESPONSE_VALUE,
};
use crate::protocol::executor::CommandLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingAuth,
    Authenticated,
    Closed,
}

/// What the session has to do after a packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Write these packets and keep reading
    Reply(Vec<Packet>),
    /// Write these packets, then close the connection
    ReplyAndClose(Vec<Packet>),
    /// Run the command and pass its status to [`ConnectionState::complete`]
    Execute(CommandRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub request_id: i32,
    pub command: CommandLine,
}

#[derive(Debug)]
pub struct ConnectionState {
    phase: SessionPhase,
    /// Chunks of the last command result not yet delivered, in order
    pending: VecDeque<Packet>,
    chunk_size: usize,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(RESPONSE_CHUNK_SIZE)
    }
}

impl ConnectionState {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            phase: SessionPhase::AwaitingAuth,
            pending: VecDeque::new(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    /// Number of buffered chunks still waiting for a "more data" request
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop buffered output; used on every auth/command request and on close
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn close(&mut self) {
        self.clear_pending();
        self.phase = SessionPhase::Closed;
    }

    /// Advance the state machine for one inbound packet.
    pub fn on_packet(&mut self, packet: &Packet, password: &str) -> Step {
        match (self.phase, packet.packet_type) {
            (SessionPhase::Closed, _) => Step::ReplyAndClose(Vec::new()),
            (_, SERVERDATA_AUTH) => self.on_auth(packet, password),
            (SessionPhase::AwaitingAuth, packet_type) => {
                warn!(
                    request_id = packet.id,
                    packet_type, "Request before authentication, rejecting"
                );
                self.close();
                Step::ReplyAndClose(vec![Packet::empty(
                    AUTH_FAILURE_ID,
                    SERVERDATA_AUTH_RESPONSE,
                )])
            }
            (SessionPhase::Authenticated, SERVERDATA_EXECCOMMAND) => self.on_command(packet),
            (SessionPhase::Authenticated, SERVERDATA_RESPONSE_VALUE) => self.on_more_data(packet),
            (SessionPhase::Authenticated, packet_type) => {
                debug!(request_id = packet.id, packet_type, "Ignoring unknown packet type");
                Step::Reply(Vec::new())
            }
        }
    }

    fn on_auth(&mut self, packet: &Packet, password: &str) -> Step {
        self.clear_pending();
        let ack = Packet::empty(packet.id, SERVERDATA_RESPONSE_VALUE);

        if packet.body == password {
            info!(request_id = packet.id, "RCON client authenticated");
            self.phase = SessionPhase::Authenticated;
            Step::Reply(vec![
                ack,
                Packet::empty(packet.id, SERVERDATA_AUTH_RESPONSE),
            ])
        } else {
            warn!(request_id = packet.id, "RCON authentication failed");
            self.close();
            Step::ReplyAndClose(vec![
                ack,
                Packet::empty(AUTH_FAILURE_ID, SERVERDATA_AUTH_RESPONSE),
            ])
        }
    }

    fn on_command(&mut self, packet: &Packet) -> Step {
        self.clear_pending();
        if packet.body.is_empty() {
            return Step::Reply(vec![Packet::empty(packet.id, SERVERDATA_RESPONSE_VALUE)]);
        }
        Step::Execute(CommandRequest {
            request_id: packet.id,
            command: CommandLine::parse(&packet.body),
        })
    }

    fn on_more_data(&mut self, packet: &Packet) -> Step {
        match self.pending.pop_front() {
            Some(next) => Step::Reply(vec![next]),
            None => Step::Reply(vec![Packet::empty(packet.id, SERVERDATA_RESPONSE_VALUE)]),
        }
    }

    /// Record a finished command and return the packet to send right away.
    ///
    /// The remaining chunks stay buffered for follow-up requests.
    pub fn complete(&mut self, request_id: i32, status: &str) -> Packet {
        let mut chunks = chunk_response(status, self.chunk_size)
            .into_iter()
            .map(|body| Packet::new(request_id, SERVERDATA_RESPONSE_VALUE, body));

        let first = chunks
            .next()
            .unwrap_or_else(|| Packet::empty(request_id, SERVERDATA_RESPONSE_VALUE));
        self.pending = chunks.collect();

        if !self.pending.is_empty() {
            debug!(
                request_id,
                buffered = self.pending.len(),
                "Command output split across packets"
            );
        }
        first
    }
}

/// Split `status` into bodies of at most `chunk_size` bytes.
///
/// Cuts fall on UTF-8 character boundaries, so a chunk may be a few bytes
/// short of the limit. NUL characters cannot travel in a body and are removed.
/// Always yields at least one (possibly empty) chunk.
pub fn chunk_response(status: &str, chunk_size: usize) -> Vec<String> {
    let cleaned;
    let mut rest = if status.contains('\0') {
        cleaned = status.replace('\0', "");
        cleaned.as_str()
    } else {
        status
    };

    let chunk_size = chunk_size.max(4);
    if rest.len() <= chunk_size {
        return vec![rest.to_string()];
    }

    let mut chunks = Vec::with_capacity(rest.len() / chunk_size + 1);
    while !rest.is_empty() {
        let mut cut = chunk_size.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head.to_string());
        rest = tail;
    }
    chunks
}
