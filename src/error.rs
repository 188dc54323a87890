//! # Error Types
//!
//! Error handling for the RCON server.
//!
//! This module defines all error variants that can occur while serving RCON
//! clients, from low-level socket failures to configuration problems.
//!
//! ## Error Categories
//! - **I/O Errors**: socket read/write failures, refused binds
//! - **Protocol Errors**: oversized frames, bodies that cannot be framed
//! - **Session Errors**: idle timeouts, closed connections, cancellation
//! - **Host Errors**: command executor failures, bad configuration
//!
//! Protocol violations by a client (bad password, commands before auth, short
//! frames) are *not* errors: the session answers them as the protocol
//! requires and closes. Only genuine failures surface as [`ProtocolError`].
//!
//! ## Example Usage
//! ```rust
//! use source_rcon::error::{ProtocolError, Result};
//! use tracing::{error, info};
//!
//! fn check_port(port: u16) -> Result<u16> {
//!     if port == 0 {
//!         return Err(ProtocolError::ConfigError("port must not be 0".into()));
//!     }
//!     Ok(port)
//! }
//!
//! match check_port(42425) {
//!     Ok(port) => info!(port, "Port accepted"),
//!     Err(e) => error!(error = %e, "Port rejected"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_CONNECTION_TIMEOUT: &str = "Connection timed out (no activity)";
    pub const ERR_TIMEOUT: &str = "Operation timed out";

    /// Framing errors
    pub const ERR_OVERSIZED_PACKET: &str = "Packet exceeds maximum size";
    pub const ERR_NUL_IN_BODY: &str = "Packet body contains a NUL byte";

    /// Server lifecycle errors
    pub const ERR_NO_PASSWORD: &str = "RCON password is empty; server disabled";
    pub const ERR_ALREADY_STARTED: &str = "RCON server already started";
    pub const ERR_EXECUTOR_PANICKED: &str = "Command executor panicked";
}

/// ProtocolError is the primary error type for all RCON server operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to bind RCON listener on {address}: {source}")]
    BindFailed {
        address: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("{}", constants::ERR_CONNECTION_CLOSED)]
    ConnectionClosed,

    #[error("{}: {0} bytes", constants::ERR_OVERSIZED_PACKET)]
    OversizedPacket(usize),

    #[error("{}", constants::ERR_NUL_IN_BODY)]
    InvalidBody,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("{}", constants::ERR_TIMEOUT)]
    Timeout,

    #[error("{}", constants::ERR_CONNECTION_TIMEOUT)]
    ConnectionTimeout,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Command executor failed: {0}")]
    ExecutorFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether this error is part of an orderly shutdown rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ProtocolError::Cancelled)
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
