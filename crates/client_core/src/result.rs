//! Raw outcomes produced by the remote and cache collaborators.

use std::{future::Future, time::Duration};

use tracing::warn;

use crate::constants::CACHE_ERROR_TIMEOUT;

/// Outcome of a remote call. Collaborators never surface a Rust error;
/// every failure is one of the two error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteResult<T> {
    Success(Option<T>),
    GenericError(String),
    TransportError,
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    Success(Option<T>),
    GenericError(String),
}

impl<T> RemoteResult<T> {
    pub fn ok(value: T) -> Self {
        Self::Success(Some(value))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl<T> CacheResult<T> {
    pub fn ok(value: T) -> Self {
        Self::Success(Some(value))
    }
}

/// Runs a remote call under `timeout`. An elapsed timer counts as a
/// transport failure.
pub async fn safe_api_call<T, F>(timeout: Duration, call: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "remote call timed out");
            RemoteResult::TransportError
        }
    }
}

/// Runs a cache operation under `timeout`, folding both the timer and the
/// storage error into [`CacheResult::GenericError`].
pub async fn safe_cache_call<T, F>(timeout: Duration, call: F) -> CacheResult<T>
where
    F: Future<Output = anyhow::Result<Option<T>>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => CacheResult::Success(value),
        Ok(Err(err)) => CacheResult::GenericError(format!("{err:#}")),
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "cache call timed out");
            CacheResult::GenericError(CACHE_ERROR_TIMEOUT.to_string())
        }
    }
}

/// Translates a storage write sentinel into a result. Negative row ids mean
/// nothing was written.
pub fn check_write(written: anyhow::Result<i64>, failure: &str) -> Result<i64, String> {
    match written {
        Ok(row) if row >= 0 => Ok(row),
        Ok(_) => Err(failure.to_string()),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "cache write failed");
            Err(failure.to_string())
        }
    }
}

#[cfg(test)]
#[path = "tests/result_tests.rs"]
mod tests;
