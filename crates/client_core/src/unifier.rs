//! Normalization of raw collaborator results into [`DataState`].
//!
//! Both entry points apply the same policy: transport failures and generic
//! errors become dialog errors prefixed with the event's `error_info`, a
//! null success becomes [`DATA_IS_NULL`], and only a present value reaches
//! the caller's success handler.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::task::{JoinError, JoinHandle};
use tracing::error;

use crate::{
    constants::{DATA_IS_NULL, ERROR_UNKNOWN, NETWORK_ERROR},
    data_state::DataState,
    event::SharedEvent,
    result::{CacheResult, RemoteResult},
};

pub async fn normalize_remote<T, S, F, Fut>(
    result: RemoteResult<T>,
    event: &SharedEvent,
    handle_success: F,
) -> DataState<S>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = DataState<S>>,
{
    match result {
        RemoteResult::TransportError => DataState::failure(NETWORK_ERROR, event.clone()),
        RemoteResult::GenericError(reason) => DataState::failure(&reason, event.clone()),
        RemoteResult::Success(None) => DataState::failure(DATA_IS_NULL, event.clone()),
        RemoteResult::Success(Some(value)) => handle_success(value).await,
    }
}

/// Same policy as [`normalize_remote`], except that the success handler runs
/// on its own spawned task and is awaited to completion. Dropping the returned
/// future aborts that task, so a cancelled request leaves nothing running.
pub async fn normalize_cache<T, S, F, Fut>(
    result: CacheResult<T>,
    event: &SharedEvent,
    handle_success: F,
) -> DataState<S>
where
    T: Send + 'static,
    S: Send + 'static,
    F: FnOnce(T) -> Fut + Send + 'static,
    Fut: Future<Output = DataState<S>> + Send + 'static,
{
    match result {
        CacheResult::GenericError(reason) => DataState::failure(&reason, event.clone()),
        CacheResult::Success(None) => DataState::failure(DATA_IS_NULL, event.clone()),
        CacheResult::Success(Some(value)) => {
            let handler = AbortOnDrop(tokio::spawn(async move { handle_success(value).await }));
            match handler.await {
                Ok(state) => state,
                Err(err) => {
                    error!(kind = event.kind(), error = %err, "cache success handler failed");
                    DataState::failure(ERROR_UNKNOWN, event.clone())
                }
            }
        }
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
#[path = "tests/unifier_tests.rs"]
mod tests;
