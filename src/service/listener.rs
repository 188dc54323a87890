//! RCON accept loop.
//!
//! Owns the listening socket and spawns one [`run_session`] task per accepted
//! connection. Connections are never capped here. In-flight sessions live in a
//! [`JoinSet`] so shutdown can wait for every one of them; finished tasks are
//! reaped as the loop goes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::error::{ProtocolError, Result};
use crate::service::session::{run_session, SessionContext};

/// First pause after a failed accept; doubles per consecutive failure
const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before the next accept after `failures` consecutive errors
pub(crate) fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1u32 << failures.saturating_sub(1).min(16))
        .min(ACCEPT_BACKOFF_MAX)
}

pub struct RconListener {
    /// Taken by `run`; `None` afterwards or once stopped
    inner: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    stopped: CancellationToken,
    ctx: Arc<SessionContext>,
}

impl RconListener {
    /// Bind the listening socket. Failure (e.g. port in use) is fatal to startup.
    #[instrument(skip(ctx))]
    pub async fn bind(address: SocketAddr, ctx: Arc<SessionContext>) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ProtocolError::BindFailed { address, source })?;
        let local_addr = listener.local_addr()?;

        info!(address = %local_addr, "RCON listener started");

        Ok(Self {
            inner: Mutex::new(Some(listener)),
            local_addr,
            stopped: CancellationToken::new(),
            ctx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `cancel` fires or [`stop`](Self::stop) is called.
    ///
    /// Each session gets a child of `cancel`, so cancelling also interrupts
    /// their pending reads. Stopping only closes the socket; sessions already
    /// running carry on. Returns only after every session has finished.
    #[instrument(skip_all, fields(address = %self.local_addr))]
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let Some(listener) = self.inner.lock().await.take() else {
            error!("Could not start listening for sockets");
            return Err(ProtocolError::ConnectionClosed);
        };

        info!("Listening for RCON connections");
        let mut sessions = JoinSet::new();
        let mut accept_failures = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Shutting down RCON listener");
                    break;
                }
                _ = self.stopped.cancelled() => break,
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        error!(error = %e, "RCON session task panicked");
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        accept_failures = 0;
                        info!(peer = %peer, "RCON connection received");
                        sessions.spawn(run_session(
                            stream,
                            peer,
                            Arc::clone(&self.ctx),
                            cancel.child_token(),
                        ));
                    }
                    Err(e) => {
                        // Transient (reset before accept) or resource exhaustion such as EMFILE
                        accept_failures = accept_failures.saturating_add(1);
                        let pause = accept_backoff(accept_failures);
                        error!(error = %e, failures = accept_failures, ?pause, "Error accepting RCON connection");
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = tokio::time::sleep(pause) => {}
                        }
                    }
                },
            }
        }

        drop(listener);
        debug!(in_flight = sessions.len(), "Waiting for RCON sessions to finish");
        while let Some(finished) = sessions.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "RCON session task panicked");
            }
        }
        info!("RCON listener stopped");
        Ok(())
    }

    /// Close the listening socket. Idempotent.
    pub async fn stop(&self) {
        if self.stopped.is_cancelled() {
            return;
        }
        self.stopped.cancel();
        self.inner.lock().await.take();
        info!(address = %self.local_addr, "RCON listener closed");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }
}
