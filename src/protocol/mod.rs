//! # Protocol Layer
//!
//! RCON session semantics on top of the packet codec.
//!
//! ## Components
//! - **State**: authenticate → execute → paginate state machine, one per connection
//! - **Executor**: the host capability that turns a command line into status text
//! - **Dispatcher**: a ready-made name → handler executor
//!
//! ## Flow
//! ```text
//! AUTH(3, password)   -> RESPONSE_VALUE(id, "") + AUTH_RESPONSE(id | -1, "")
//! EXECCOMMAND(2, cmd) -> RESPONSE_VALUE(id, chunk 1)
//! RESPONSE_VALUE(0)   -> RESPONSE_VALUE(id, chunk n) ... then an empty packet
//! ```

pub mod dispatcher;
pub mod executor;
pub mod state;

#[cfg(test)]
mod tests;
