//! Cache-then-network reconciliation.
//!
//! The remote call runs first and is never gated by the cache. A successful
//! remote value is written to the cache (best effort), and the cache is then
//! read again: that post-write read is what the caller receives, not the
//! network payload.

use std::{future::Future, time::Duration};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::{
    constants::{CACHE_TIMEOUT, NETWORK_TIMEOUT},
    data_state::DataState,
    event::SharedEvent,
    result::{safe_api_call, safe_cache_call, RemoteResult},
    unifier::{normalize_cache, normalize_remote},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    pub network: Duration,
    pub cache: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            network: NETWORK_TIMEOUT,
            cache: CACHE_TIMEOUT,
        }
    }
}

type UpdateCache<R> = Box<dyn FnOnce(R) -> BoxFuture<'static, anyhow::Result<()>> + Send>;
type LoadCache<C> = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<Option<C>>> + Send>;
type HandleCached<C, S> = Box<dyn FnOnce(C) -> BoxFuture<'static, DataState<S>> + Send>;

struct CacheRead<C, S> {
    load: LoadCache<C>,
    handle_success: HandleCached<C, S>,
}

pub struct CacheThenNetworkResource<R, C, S> {
    event: SharedEvent,
    timeouts: CallTimeouts,
    remote_call: BoxFuture<'static, RemoteResult<R>>,
    update_cache: Option<UpdateCache<R>>,
    read_cache: Option<CacheRead<C, S>>,
}

impl<R, C, S> CacheThenNetworkResource<R, C, S>
where
    R: Send + 'static,
    C: Send + 'static,
    S: Send + 'static,
{
    pub fn new<F>(event: SharedEvent, timeouts: CallTimeouts, remote_call: F) -> Self
    where
        F: Future<Output = RemoteResult<R>> + Send + 'static,
    {
        Self {
            event,
            timeouts,
            remote_call: Box::pin(remote_call),
            update_cache: None,
            read_cache: None,
        }
    }

    /// Writes a successful remote value to the cache. Failures are logged
    /// and never fail the request.
    pub fn update_cache_with<F, Fut>(mut self, update: F) -> Self
    where
        F: FnOnce(R) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.update_cache = Some(Box::new(move |value| Box::pin(update(value))));
        self
    }

    /// Configures the cache read that produces the final outcome.
    pub fn read_cache_with<L, LFut, H, HFut>(mut self, load: L, handle_success: H) -> Self
    where
        L: FnOnce() -> LFut + Send + 'static,
        LFut: Future<Output = anyhow::Result<Option<C>>> + Send + 'static,
        H: FnOnce(C) -> HFut + Send + 'static,
        HFut: Future<Output = DataState<S>> + Send + 'static,
    {
        self.read_cache = Some(CacheRead {
            load: Box::new(move || Box::pin(load())),
            handle_success: Box::new(move |cached| Box::pin(handle_success(cached))),
        });
        self
    }

    pub async fn run(self) -> DataState<S> {
        let Self {
            event,
            timeouts,
            remote_call,
            update_cache,
            read_cache,
        } = self;
        let kind = event.kind();

        let remote = safe_api_call(timeouts.network, remote_call).await;
        let success_event = event.clone();
        let remote_state = normalize_remote(remote, &event, |value| async move {
            if let Some(update) = update_cache {
                if let Err(err) = safe_update(timeouts.cache, update(value)).await {
                    warn!(kind, error = %format!("{err:#}"), "cache update failed");
                }
            }
            DataState::noop(success_event)
        })
        .await;

        let Some(read) = read_cache else {
            return remote_state;
        };
        let cached = safe_cache_call(timeouts.cache, (read.load)()).await;
        let cached_state = normalize_cache(cached, &event, read.handle_success).await;

        if !remote_state.is_error() {
            return cached_state;
        }
        match cached_state {
            DataState::Data {
                data: Some(data), ..
            } => {
                debug!(kind, "remote call failed, relaying cached data");
                DataState::data(Some(data), remote_state.message().cloned(), event)
            }
            _ => remote_state,
        }
    }
}

async fn safe_update(
    timeout: Duration,
    update: BoxFuture<'static, anyhow::Result<()>>,
) -> anyhow::Result<()> {
    tokio::time::timeout(timeout, update)
        .await
        .map_err(|_| anyhow::anyhow!(crate::constants::CACHE_ERROR_TIMEOUT))?
}

#[cfg(test)]
#[path = "tests/resource_tests.rs"]
mod tests;
