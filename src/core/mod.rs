//! # Core Protocol Components
//!
//! Low-level packet handling and stream framing.
//!
//! ## Components
//! - **Packet**: the RCON wire unit (id, type, NUL-terminated body)
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Size(4)] [Id(4)] [Type(4)] [Body(N)] [0x00 0x00]      all integers little-endian
//! ```
//!
//! ## Safety
//! - Inbound frames are capped (4096 bytes by default) before any allocation
//! - Short frames degrade to a sentinel instead of raising

pub mod codec;
pub mod packet;
