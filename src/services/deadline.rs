use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Runs a store call, failing with `AppError::Timeout` if it outlives `limit`.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("⏱️ Store call exceeded {:?}", limit);
            Err(AppError::Timeout)
        }
    }
}
