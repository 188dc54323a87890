//! Client-side transports.
//!
//! The server accepts connections itself (see [`crate::service`]); this module
//! holds the client half used for tooling and end-to-end tests.

pub mod tcp;
