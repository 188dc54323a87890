//! Async timeout helpers.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProtocolError, Result};

/// Bound on a single write when no idle timeout is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a graceful shutdown waits for sessions to drain
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `fut` with a deadline, mapping expiry to [`ProtocolError::Timeout`]
pub async fn with_timeout<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| ProtocolError::Timeout)
}

/// Like [`with_timeout`] for fallible futures, flattening the inner error
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    with_timeout(fut, duration).await?
}
