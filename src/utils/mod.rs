//! # Utility Modules
//!
//! Supporting utilities for logging, metrics and timing.
//!
//! ## Components
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe counters for connections, auth and traffic
//! - **Timeout**: Async timeout wrappers

pub mod logging;
pub mod metrics;
pub mod timeout;

pub use metrics::{Metrics, MetricsSnapshot};
