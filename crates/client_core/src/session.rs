use std::sync::Arc;

use shared::domain::AuthToken;
use storage::Storage;
use tokio::sync::watch;
use tracing::{info, warn};

/// Explicit handle on the authenticated account, passed to every view model
/// that needs credentials.
#[derive(Clone)]
pub struct SessionContext {
    token: Arc<watch::Sender<Option<AuthToken>>>,
    storage: Storage,
}

impl SessionContext {
    pub fn new(storage: Storage) -> Self {
        let (token, _) = watch::channel(None);
        Self {
            token: Arc::new(token),
            storage,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn login(&self, auth_token: AuthToken) {
        info!(account_pk = auth_token.account_pk.0, "session authenticated");
        self.token.send_replace(Some(auth_token));
    }

    pub fn current(&self) -> Option<AuthToken> {
        self.token.borrow().clone()
    }

    /// Current token, only if it still carries a credential.
    pub fn authenticated(&self) -> Option<AuthToken> {
        self.current().filter(|token| token.token.is_some())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthToken>> {
        self.token.subscribe()
    }

    /// Nullifies the cached token, best effort, then clears the session.
    pub async fn logout(&self) {
        if let Some(auth_token) = self.current() {
            if let Err(err) = self.storage.nullify_token(auth_token.account_pk).await {
                warn!(account_pk = auth_token.account_pk.0, error = %format!("{err:#}"), "failed to clear cached token");
            }
            info!(account_pk = auth_token.account_pk.0, "session logged out");
        }
        self.token.send_replace(None);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
