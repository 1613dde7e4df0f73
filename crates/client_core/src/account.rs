//! Account properties and password changes for the signed-in account.

use std::{fmt, sync::Arc};

use shared::domain::{AccountProperties, AuthToken};
use storage::Storage;
use tracing::warn;

use crate::{
    constants::{
        ERROR_NOT_AUTHENTICATED, RESPONSE_LOGGED_OUT, SUCCESS_ACCOUNT_UPDATED,
        SUCCESS_PASSWORD_UPDATED,
    },
    data_state::{build_error, DataState},
    event::{SharedEvent, StateEvent},
    fields::{FieldError, PasswordFields},
    message::{Message, UiComponentType},
    remote::RemoteApi,
    resource::{CacheThenNetworkResource, CallTimeouts},
    result::safe_api_call,
    session::SessionContext,
    unifier::normalize_remote,
    view_model::{ViewModel, ViewStateHandler},
};

#[derive(Clone)]
pub enum AccountStateEvent {
    GetAccountProperties,
    UpdateAccountProperties {
        email: String,
        username: String,
    },
    ChangePassword {
        current_password: String,
        new_password: String,
        confirm_new_password: String,
    },
}

impl fmt::Debug for AccountStateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl StateEvent for AccountStateEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::GetAccountProperties => "GetAccountProperties",
            Self::UpdateAccountProperties { .. } => "UpdateAccountProperties",
            Self::ChangePassword { .. } => "ChangePassword",
        }
    }

    fn error_info(&self) -> String {
        match self {
            Self::GetAccountProperties => "Error retrieving account properties.",
            Self::UpdateAccountProperties { .. } => "Error updating account properties.",
            Self::ChangePassword { .. } => "Error changing password.",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountData {
    Properties(AccountProperties),
    PasswordChanged,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountViewState {
    pub account_properties: Option<AccountProperties>,
}

pub struct AccountRepository {
    remote: Arc<dyn RemoteApi>,
    storage: Storage,
    timeouts: CallTimeouts,
}

impl AccountRepository {
    pub fn new(remote: Arc<dyn RemoteApi>, storage: Storage, timeouts: CallTimeouts) -> Self {
        Self {
            remote,
            storage,
            timeouts,
        }
    }

    /// Refreshes the cached properties from the server and relays the cached
    /// row for the session's account.
    pub async fn get_account_properties(
        &self,
        event: SharedEvent,
        auth: AuthToken,
    ) -> DataState<AccountData> {
        let remote = Arc::clone(&self.remote);
        let remote_auth = auth.clone();
        let remote_call = async move { remote.get_account_properties(&remote_auth).await };

        let update_storage = self.storage.clone();
        let read_storage = self.storage.clone();
        let handler_event = Arc::clone(&event);
        CacheThenNetworkResource::new(event, self.timeouts, remote_call)
            .update_cache_with(move |properties: AccountProperties| async move {
                if update_storage
                    .insert_and_replace_account(&properties)
                    .await?
                    < 0
                {
                    anyhow::bail!("account {} was not cached", properties.pk.0);
                }
                anyhow::Ok(())
            })
            .read_cache_with(
                move || async move { read_storage.account_by_pk(auth.account_pk).await },
                move |properties: AccountProperties| async move {
                    DataState::data(Some(AccountData::Properties(properties)), None, handler_event)
                },
            )
            .run()
            .await
    }

    pub async fn save_account_properties(
        &self,
        event: SharedEvent,
        auth: AuthToken,
        email: String,
        username: String,
    ) -> DataState<AccountData> {
        if email.trim().is_empty() || username.trim().is_empty() {
            return build_error(
                FieldError::MissingFields.to_string(),
                UiComponentType::Dialog,
                event,
            );
        }

        let result = safe_api_call(
            self.timeouts.network,
            self.remote.save_account_properties(&auth, &email, &username),
        )
        .await;
        let success_event = Arc::clone(&event);
        normalize_remote(result, &event, move |response| async move {
            if response.response != SUCCESS_ACCOUNT_UPDATED {
                return build_error(response.response, UiComponentType::Dialog, success_event);
            }
            match self
                .storage
                .update_account(auth.account_pk, &email, &username)
                .await
            {
                Ok(0) => warn!(account_pk = auth.account_pk.0, "account row missing from cache"),
                Ok(_) => {}
                Err(err) => {
                    warn!(account_pk = auth.account_pk.0, error = %format!("{err:#}"), "failed to update cached account");
                }
            }
            let properties = AccountProperties {
                pk: auth.account_pk,
                email,
                username,
            };
            DataState::data(
                Some(AccountData::Properties(properties)),
                Some(Message::toast_success(response.response)),
                success_event,
            )
        })
        .await
    }

    pub async fn update_password(
        &self,
        event: SharedEvent,
        auth: AuthToken,
        fields: PasswordFields,
    ) -> DataState<AccountData> {
        if let Err(err) = fields.validate() {
            return build_error(err.to_string(), UiComponentType::Dialog, event);
        }

        let result = safe_api_call(
            self.timeouts.network,
            self.remote.change_password(
                &auth,
                &fields.current_password,
                &fields.new_password,
                &fields.confirm_new_password,
            ),
        )
        .await;
        let success_event = Arc::clone(&event);
        normalize_remote(result, &event, move |response| async move {
            if response.response != SUCCESS_PASSWORD_UPDATED {
                return build_error(response.response, UiComponentType::Dialog, success_event);
            }
            DataState::data(
                Some(AccountData::PasswordChanged),
                Some(Message::toast_success(response.response)),
                success_event,
            )
        })
        .await
    }
}

pub struct AccountHandler;

impl ViewStateHandler for AccountHandler {
    type Data = AccountData;
    type ViewState = AccountViewState;

    fn handle_new_data(&self, view_state: &mut AccountViewState, data: AccountData) {
        if let AccountData::Properties(properties) = data {
            view_state.account_properties = Some(properties);
        }
    }
}

pub struct AccountViewModel {
    view_model: ViewModel<AccountHandler>,
    repository: Arc<AccountRepository>,
    session: SessionContext,
}

impl AccountViewModel {
    pub fn new(repository: AccountRepository, session: SessionContext) -> Self {
        Self {
            view_model: ViewModel::new(AccountHandler),
            repository: Arc::new(repository),
            session,
        }
    }

    pub fn set_state_event(&self, event: AccountStateEvent) -> bool {
        let shared: SharedEvent = Arc::new(event.clone());
        let repository = Arc::clone(&self.repository);
        let auth = self.session.authenticated();
        let job_event = Arc::clone(&shared);
        self.view_model.launch_job(shared, async move {
            let Some(auth) = auth else {
                return build_error(ERROR_NOT_AUTHENTICATED, UiComponentType::Dialog, job_event);
            };
            match event {
                AccountStateEvent::GetAccountProperties => {
                    repository.get_account_properties(job_event, auth).await
                }
                AccountStateEvent::UpdateAccountProperties { email, username } => {
                    repository
                        .save_account_properties(job_event, auth, email, username)
                        .await
                }
                AccountStateEvent::ChangePassword {
                    current_password,
                    new_password,
                    confirm_new_password,
                } => {
                    let fields = PasswordFields {
                        current_password,
                        new_password,
                        confirm_new_password,
                    };
                    repository.update_password(job_event, auth, fields).await
                }
            }
        })
    }

    pub async fn logout(&self) {
        self.view_model.cancel_active_jobs();
        self.session.logout().await;
        self.view_model
            .update_view_state(|state| *state = AccountViewState::default());
        self.view_model
            .orchestrator()
            .enqueue_message(Message::toast_success(RESPONSE_LOGGED_OUT));
    }

    pub fn view_state(&self) -> AccountViewState {
        self.view_model.view_state()
    }

    pub fn view_model(&self) -> &ViewModel<AccountHandler> {
        &self.view_model
    }

    pub fn cancel_active_jobs(&self) {
        self.view_model.cancel_active_jobs();
    }
}

#[cfg(test)]
#[path = "tests/account_tests.rs"]
mod tests;
