//! Observability and Metrics
//!
//! Counters for monitoring the RCON server: connections, authentication
//! outcomes, commands and traffic.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for RCON operations
#[derive(Debug)]
pub struct Metrics {
    /// Total connections accepted
    pub connections_total: AtomicU64,
    /// Currently open sessions
    pub connections_active: AtomicU64,
    /// Successful authentications
    pub auth_success: AtomicU64,
    /// Refused authentications
    pub auth_failed: AtomicU64,
    /// Requests refused for arriving before authentication
    pub unauthenticated_requests: AtomicU64,
    /// Commands handed to the executor
    pub commands_executed: AtomicU64,
    /// Total packets sent
    pub packets_sent: AtomicU64,
    /// Total packets received
    pub packets_received: AtomicU64,
    /// Total bytes sent
    pub bytes_sent: AtomicU64,
    /// Total bytes received
    pub bytes_received: AtomicU64,
    /// Sessions ended by I/O failures or timeouts
    pub connection_errors: AtomicU64,
    /// Malformed or oversized frames
    pub protocol_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            auth_success: AtomicU64::new(0),
            auth_failed: AtomicU64::new(0),
            unauthenticated_requests: AtomicU64::new(0),
            commands_executed: AtomicU64::new(0),
            packets_sent: AtomicU64::new(0),
            packets_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new connection
    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn auth_succeeded(&self) {
        self.auth_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn auth_refused(&self) {
        self.auth_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unauthenticated_request(&self) {
        self.unauthenticated_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_executed(&self) {
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a packet sent
    pub fn packet_sent(&self, byte_count: u64) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a packet received
    pub fn packet_received(&self, byte_count: u64) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a connection error
    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a protocol error
    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            auth_success: self.auth_success.load(Ordering::Relaxed),
            auth_failed: self.auth_failed.load(Ordering::Relaxed),
            unauthenticated_requests: self.unauthenticated_requests.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            auth_success = snapshot.auth_success,
            auth_failed = snapshot.auth_failed,
            unauthenticated_requests = snapshot.unauthenticated_requests,
            commands_executed = snapshot.commands_executed,
            packets_sent = snapshot.packets_sent,
            packets_received = snapshot.packets_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            connection_errors = snapshot.connection_errors,
            protocol_errors = snapshot.protocol_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "RCON metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub auth_success: u64,
    pub auth_failed: u64,
    pub unauthenticated_requests: u64,
    pub commands_executed: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub connection_errors: u64,
    pub protocol_errors: u64,
    pub uptime_seconds: u64,
}
