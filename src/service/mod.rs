//! Server runtime.
//!
//! - [`listener`]: accept loop, one task per connection
//! - [`session`]: per-connection read/dispatch/write loop
//! - [`server`]: host-facing start and stop

pub mod listener;
pub mod server;
pub mod session;
