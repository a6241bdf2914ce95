//! Deadline helper for pipeline I/O.
//!
//! Every suspension point (archive extraction, file I/O, git subprocess,
//! LLM call) runs under a deadline; exceeding it raises `Timeout`, which
//! the orchestrator records as a diagnostic and moves on from.

use std::future::Future;
use std::time::Duration;

use crate::types::{FolioError, Result};

/// Run an async operation under a deadline.
pub async fn with_timeout<T, F>(deadline: Duration, future: F, operation: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(FolioError::timeout(operation, deadline)),
    }
}
