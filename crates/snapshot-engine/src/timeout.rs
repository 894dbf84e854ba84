//! Deadline helper shared by the options guard and category tasks

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, SnapshotError};

/// Race `operation` against a timer
///
/// If the timer wins the operation future is dropped, which cancels it.
pub async fn with_timeout<F, T>(operation: &str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(SnapshotError::Timeout {
            operation: operation.to_string(),
            millis: limit.as_millis(),
        }),
    }
}
