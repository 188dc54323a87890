//! One RCON connection, from accept to socket shutdown.
//!
//! Frames are processed strictly in arrival order; there is no concurrency
//! inside a session. Every exit path (protocol rejection, idle timeout, I/O
//! failure, cancellation) clears buffered output and shuts the socket down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ServerConfig;
use crate::core::codec::{Frame, PacketCodec};
use crate::core::packet::{Packet, SERVERDATA_AUTH};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::executor::{Caller, CommandExecutor, CommandLine};
use crate::protocol::state::{ConnectionState, Step};
use crate::utils::metrics::Metrics;
use crate::utils::timeout::{with_timeout_error, DEFAULT_TIMEOUT};

/// Read-only settings and capabilities shared by every session of a server
pub struct SessionContext {
    pub password: String,
    /// `None` keeps a silent connection open indefinitely
    pub idle_timeout: Option<Duration>,
    pub max_packet_size: usize,
    pub response_chunk_size: usize,
    pub executor: Arc<dyn CommandExecutor>,
    pub metrics: Arc<Metrics>,
}

impl SessionContext {
    pub fn new(
        config: &ServerConfig,
        executor: Arc<dyn CommandExecutor>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            password: config.password.clone(),
            idle_timeout: config.idle_timeout(),
            max_packet_size: config.max_packet_size,
            response_chunk_size: config.response_chunk_size,
            executor,
            metrics,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn write_timeout(&self) -> Duration {
        self.idle_timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

type RconFramed = Framed<TcpStream, PacketCodec>;

/// Serve one accepted connection until it closes, times out or `cancel` fires.
///
/// Errors are already logged here; the returned result is informational.
#[instrument(skip_all, fields(peer = %peer))]
pub async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<SessionContext>,
    cancel: CancellationToken,
) -> Result<()> {
    ctx.metrics.connection_established();
    info!("RCON session started");

    let mut framed = Framed::new(stream, PacketCodec::new(ctx.max_packet_size));
    let mut state = ConnectionState::new(ctx.response_chunk_size);

    let result = drive(&mut framed, &mut state, &ctx, &cancel).await;

    state.close();
    if let Err(e) = framed.into_inner().shutdown().await {
        debug!(error = %e, "Socket shutdown failed");
    }
    ctx.metrics.connection_closed();

    match &result {
        Ok(()) => info!("RCON socket closed"),
        Err(e) if e.is_cancellation() => info!("Shutting down RCON connection"),
        Err(ProtocolError::ConnectionTimeout) => {
            ctx.metrics.connection_error();
            info!(timeout = ?ctx.idle_timeout, "RCON connection idle, closing");
        }
        Err(ProtocolError::OversizedPacket(size)) => {
            ctx.metrics.protocol_error();
            warn!(size, "RCON connection sent an oversized frame");
        }
        Err(e) => {
            ctx.metrics.connection_error();
            warn!(error = %e, "RCON connection failed");
        }
    }
    result
}

async fn drive(
    framed: &mut RconFramed,
    state: &mut ConnectionState,
    ctx: &SessionContext,
    cancel: &CancellationToken,
) -> Result<()> {
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProtocolError::Cancelled),
            read = next_frame(framed, ctx.idle_timeout) => match read? {
                None => {
                    info!("RCON connection dropped by peer");
                    return Ok(());
                }
                Some(frame) => frame?,
            },
        };

        let packet = match frame {
            Frame::Packet(packet) => packet,
            Frame::Malformed { declared_size } => {
                ctx.metrics.protocol_error();
                info!(declared_size, "RCON connection dropped");
                return Ok(());
            }
        };
        ctx.metrics.packet_received(packet.wire_len() as u64);

        let was_authenticated = state.is_authenticated();
        let step = state.on_packet(&packet, &ctx.password);
        record_auth(ctx, &packet, was_authenticated, state, &step);

        match step {
            Step::Reply(packets) => send_all(framed, packets, ctx).await?,
            Step::ReplyAndClose(packets) => {
                send_all(framed, packets, ctx).await?;
                return Ok(());
            }
            Step::Execute(request) => {
                info!(request_id = request.request_id, command = %request.command, "Handling RCON command");
                let status = execute(ctx, request.command).await?;
                ctx.metrics.command_executed();
                let first = state.complete(request.request_id, &status);
                send_all(framed, vec![first], ctx).await?;
            }
        }
    }
}

/// Next inbound frame, or `ConnectionTimeout` once the idle timeout elapses
async fn next_frame(
    framed: &mut RconFramed,
    idle_timeout: Option<Duration>,
) -> Result<Option<Result<Frame>>> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, framed.next())
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout),
        None => Ok(framed.next().await),
    }
}

fn record_auth(
    ctx: &SessionContext,
    packet: &Packet,
    was_authenticated: bool,
    state: &ConnectionState,
    step: &Step,
) {
    if packet.packet_type == SERVERDATA_AUTH {
        if state.is_authenticated() {
            ctx.metrics.auth_succeeded();
        } else {
            ctx.metrics.auth_refused();
        }
    } else if !was_authenticated && matches!(step, Step::ReplyAndClose(_)) {
        ctx.metrics.unauthenticated_request();
    }
}

/// Run the command on the blocking pool; host executors are synchronous
async fn execute(ctx: &SessionContext, command: CommandLine) -> Result<String> {
    let executor = Arc::clone(&ctx.executor);
    tokio::task::spawn_blocking(move || {
        executor.execute(&command.name, &command.args, &Caller::console())
    })
    .await
    .map_err(|e| {
        if e.is_panic() {
            ProtocolError::ExecutorFailed(constants::ERR_EXECUTOR_PANICKED.to_string())
        } else {
            ProtocolError::ExecutorFailed(e.to_string())
        }
    })
}

async fn send_all(framed: &mut RconFramed, packets: Vec<Packet>, ctx: &SessionContext) -> Result<()> {
    if packets.is_empty() {
        return Ok(());
    }

    with_timeout_error(
        async {
            for packet in packets {
                let len = packet.wire_len() as u64;
                framed.feed(packet).await?;
                ctx.metrics.packet_sent(len);
            }
            framed.flush().await
        },
        ctx.write_timeout(),
    )
    .await
}
