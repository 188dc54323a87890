//! # source-rcon
//!
//! An embeddable Source RCON server for game hosts.
//!
//! Remote administrators connect over TCP, authenticate with a shared password
//! and run console commands. Output longer than one packet is paginated: the
//! first chunk is sent straight away and the rest is pulled with empty
//! `RESPONSE_VALUE` requests.
//!
//! ## Layout
//! - [`core`]: packet layout and the Tokio codec
//! - [`protocol`]: per-connection state machine and the command executor seam
//! - [`service`]: accept loop, sessions and the host-facing [`RconServer`]
//! - [`transport`]: TCP client for tooling and tests
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging, metrics
//!
//! ## Quick start
//! ```rust,no_run
//! use source_rcon::{CommandRegistry, RconConfig, RconServer};
//!
//! # async fn run() -> source_rcon::Result<()> {
//! let config = RconConfig::load_or_create(source_rcon::config::CONFIG_FILE_NAME)?;
//! source_rcon::utils::logging::init_logging(&config.logging)?;
//!
//! let commands = CommandRegistry::new();
//! commands.register("ping", |_, _| "pong".to_string());
//!
//! let mut server = RconServer::from_config(&config, commands);
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use config::RconConfig;
pub use core::codec::PacketCodec;
pub use core::packet::Packet;
pub use error::{ProtocolError, Result};
pub use protocol::dispatcher::CommandRegistry;
pub use protocol::executor::{Caller, CommandExecutor};
pub use service::listener::RconListener;
pub use service::server::RconServer;
