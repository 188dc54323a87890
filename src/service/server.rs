//! Host-facing RCON server handle.
//!
//! The host builds an [`RconServer`] from its configuration and command
//! executor, calls [`start`](RconServer::start) once the game is running, and
//! [`dispose`](RconServer::dispose) or [`shutdown`](RconServer::shutdown) when
//! it stops.
//!
//! ```rust,no_run
//! use source_rcon::config::ServerConfig;
//! use source_rcon::protocol::executor::Caller;
//! use source_rcon::service::server::RconServer;
//!
//! # async fn run() -> source_rcon::error::Result<()> {
//! let config = ServerConfig {
//!     password: "secret".into(),
//!     ..ServerConfig::default()
//! };
//! let mut server = RconServer::new(config, |cmd: &str, _: &[String], _: &Caller| {
//!     format!("ran {cmd}")
//! });
//! let addr = server.start().await?;
//! println!("RCON on {addr}");
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{RconConfig, ServerConfig};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::executor::CommandExecutor;
use crate::service::listener::RconListener;
use crate::service::session::SessionContext;
use crate::utils::metrics::Metrics;
use crate::utils::timeout::with_timeout;

pub struct RconServer {
    config: ServerConfig,
    executor: Arc<dyn CommandExecutor>,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
    running: Option<Running>,
}

struct Running {
    listener: Arc<RconListener>,
    task: JoinHandle<Result<()>>,
}

impl RconServer {
    pub fn new<E: CommandExecutor>(config: ServerConfig, executor: E) -> Self {
        Self::with_executor(config, Arc::new(executor))
    }

    pub fn with_executor(config: ServerConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            config,
            executor,
            metrics: Arc::new(Metrics::new()),
            cancel: CancellationToken::new(),
            running: None,
        }
    }

    pub fn from_config<E: CommandExecutor>(config: &RconConfig, executor: E) -> Self {
        Self::new(config.server.clone(), executor)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Address actually bound, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.listener.local_addr())
    }

    /// Bind and begin accepting in the background.
    ///
    /// Refuses to start without a password or with a configuration that fails
    /// [`ServerConfig::validate`]. A bind failure is reported once and the
    /// server stays stopped; there is no retry.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if !self.config.is_enabled() {
            warn!(
                "An RCON password has not been set. RCON will be unavailable until one is configured"
            );
            return Err(ProtocolError::ConfigError(
                constants::ERR_NO_PASSWORD.to_string(),
            ));
        }
        let errors = self.config.validate();
        if !errors.is_empty() {
            error!(errors = ?errors, "Invalid RCON configuration, not starting");
            return Err(ProtocolError::ConfigError(errors.join("; ")));
        }
        if self.running.is_some() || self.cancel.is_cancelled() {
            return Err(ProtocolError::ConfigError(
                constants::ERR_ALREADY_STARTED.to_string(),
            ));
        }

        info!(port = self.config.port, "Starting RCON listener");
        let ctx = Arc::new(SessionContext::new(
            &self.config,
            Arc::clone(&self.executor),
            Arc::clone(&self.metrics),
        ));

        let listener = match RconListener::bind(self.config.bind_addr(), ctx).await {
            Ok(listener) => Arc::new(listener),
            Err(e) => {
                error!(error = %e, "RCON listener failed to start");
                return Err(e);
            }
        };
        let addr = listener.local_addr();

        let task = tokio::spawn({
            let listener = Arc::clone(&listener);
            let cancel = self.cancel.clone();
            async move { listener.run(cancel).await }
        });

        self.running = Some(Running { listener, task });
        Ok(addr)
    }

    /// Cancel the accept loop and every session. Does not wait; idempotent.
    pub fn dispose(&self) {
        if !self.cancel.is_cancelled() {
            info!("Disposing RCON server");
            self.cancel.cancel();
        }
    }

    /// Cancel, then wait for in-flight sessions to finish (bounded by the
    /// configured shutdown timeout).
    pub async fn shutdown(&mut self) -> Result<()> {
        self.dispose();
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        running.listener.stop().await;

        let mut task = running.task;
        match with_timeout(&mut task, self.config.shutdown_timeout).await {
            Ok(joined) => joined.map_err(|e| ProtocolError::ExecutorFailed(e.to_string()))?,
            Err(e) => {
                warn!("RCON shutdown timeout reached, aborting remaining sessions");
                task.abort();
                Err(e)
            }
        }
    }
}

impl Drop for RconServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
