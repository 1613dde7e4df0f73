//! Login, registration and previously-authenticated-user lookup.

use std::{fmt, sync::Arc};

use shared::domain::{AccountProperties, AuthToken};
use storage::{Storage, PREVIOUS_AUTH_USER};
use tracing::{debug, warn};

use crate::{
    constants::{
        ERROR_SAVE_ACCOUNT_PROPERTIES, ERROR_SAVE_AUTH_TOKEN, ERROR_UNKNOWN, GENERIC_AUTH_ERROR,
        INVALID_CREDENTIALS, RESPONSE_CHECK_PREVIOUS_AUTH_USER_DONE,
    },
    data_state::{build_error, DataState},
    event::{normalize_param, SharedEvent, StateEvent},
    fields::{LoginFields, RegistrationFields},
    message::UiComponentType,
    remote::RemoteApi,
    resource::CallTimeouts,
    result::{check_write, safe_api_call, safe_cache_call, CacheResult},
    session::SessionContext,
    unifier::{normalize_cache, normalize_remote},
    view_model::{ViewModel, ViewStateHandler},
};

#[derive(Clone)]
pub enum AuthStateEvent {
    Login {
        email: String,
        password: String,
    },
    Register {
        email: String,
        username: String,
        password: String,
        confirm_password: String,
    },
    CheckPreviousAuth,
}

impl fmt::Debug for AuthStateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login { email, .. } => f
                .debug_struct("Login")
                .field("email", email)
                .finish_non_exhaustive(),
            Self::Register {
                email, username, ..
            } => f
                .debug_struct("Register")
                .field("email", email)
                .field("username", username)
                .finish_non_exhaustive(),
            Self::CheckPreviousAuth => f.write_str("CheckPreviousAuth"),
        }
    }
}

impl StateEvent for AuthStateEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Login",
            Self::Register { .. } => "Register",
            Self::CheckPreviousAuth => "CheckPreviousAuth",
        }
    }

    fn error_info(&self) -> String {
        match self {
            Self::Login { .. } => "Login attempt failed.",
            Self::Register { .. } => "Register attempt failed.",
            Self::CheckPreviousAuth => "Error checking for previously authenticated user.",
        }
        .to_string()
    }

    /// Credentials are keyed on the normalized email alone. The password never
    /// enters the key, which is logged, so a retry with a corrected password
    /// is suppressed until the first attempt for that email resolves.
    fn dedup_params(&self) -> String {
        match self {
            Self::Login { email, .. } | Self::Register { email, .. } => normalize_param(email),
            Self::CheckPreviousAuth => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthViewState {
    pub auth_token: Option<AuthToken>,
    pub login_fields: LoginFields,
    pub registration_fields: RegistrationFields,
}

pub struct AuthRepository {
    remote: Arc<dyn RemoteApi>,
    storage: Storage,
    timeouts: CallTimeouts,
}

impl AuthRepository {
    pub fn new(remote: Arc<dyn RemoteApi>, storage: Storage, timeouts: CallTimeouts) -> Self {
        Self {
            remote,
            storage,
            timeouts,
        }
    }

    pub async fn attempt_login(
        &self,
        event: SharedEvent,
        email: &str,
        password: &str,
    ) -> DataState<AuthToken> {
        let fields = LoginFields {
            email: email.to_string(),
            password: password.to_string(),
        };
        if let Err(err) = fields.validate() {
            return build_error(err.to_string(), UiComponentType::Dialog, event);
        }

        let result = safe_api_call(self.timeouts.network, self.remote.login(email, password)).await;
        let success_event = Arc::clone(&event);
        normalize_remote(result, &event, move |response| async move {
            let event = success_event;
            // Wrong credentials still come back with a 2xx status.
            if response.response == GENERIC_AUTH_ERROR {
                return build_error(INVALID_CREDENTIALS, UiComponentType::Dialog, event.clone());
            }
            let Some(auth_token) = response.auth_token() else {
                return DataState::failure(ERROR_UNKNOWN, event.clone());
            };
            let account = AccountProperties {
                pk: auth_token.account_pk,
                email: response.email.clone().unwrap_or_else(|| email.to_string()),
                username: String::new(),
            };
            if let Err(err) = self.storage.insert_or_ignore_account(&account).await {
                warn!(error = %format!("{err:#}"), "failed to cache account after login");
            }
            if check_write(self.storage.insert_auth_token(&auth_token).await, ERROR_SAVE_AUTH_TOKEN)
                .is_err()
            {
                return build_error(ERROR_SAVE_AUTH_TOKEN, UiComponentType::Dialog, event.clone());
            }
            self.remember_user(email).await;
            DataState::data(Some(auth_token), None, event.clone())
        })
        .await
    }

    pub async fn attempt_registration(
        &self,
        event: SharedEvent,
        fields: &RegistrationFields,
    ) -> DataState<AuthToken> {
        if let Err(err) = fields.validate() {
            return build_error(err.to_string(), UiComponentType::Dialog, event);
        }

        let result = safe_api_call(
            self.timeouts.network,
            self.remote.register(
                &fields.email,
                &fields.username,
                &fields.password,
                &fields.confirm_password,
            ),
        )
        .await;
        let success_event = Arc::clone(&event);
        normalize_remote(result, &event, move |response| async move {
            let event = success_event;
            if response.response == GENERIC_AUTH_ERROR {
                let reason = response
                    .error_message
                    .clone()
                    .unwrap_or_else(|| ERROR_UNKNOWN.to_string());
                return build_error(reason, UiComponentType::Dialog, event.clone());
            }
            let Some(auth_token) = response.auth_token() else {
                return DataState::failure(ERROR_UNKNOWN, event.clone());
            };
            let account = AccountProperties {
                pk: auth_token.account_pk,
                email: response.email.clone().unwrap_or_else(|| fields.email.clone()),
                username: response
                    .username
                    .clone()
                    .unwrap_or_else(|| fields.username.clone()),
            };
            if check_write(
                self.storage.insert_and_replace_account(&account).await,
                ERROR_SAVE_ACCOUNT_PROPERTIES,
            )
            .is_err()
            {
                return build_error(
                    ERROR_SAVE_ACCOUNT_PROPERTIES,
                    UiComponentType::Dialog,
                    event.clone(),
                );
            }
            if check_write(self.storage.insert_auth_token(&auth_token).await, ERROR_SAVE_AUTH_TOKEN)
                .is_err()
            {
                return build_error(ERROR_SAVE_AUTH_TOKEN, UiComponentType::Dialog, event.clone());
            }
            self.remember_user(&fields.email).await;
            DataState::data(Some(auth_token), None, event.clone())
        })
        .await
    }

    /// Restores the session of the last authenticated account from cache.
    pub async fn check_previous_auth_user(&self, event: SharedEvent) -> DataState<AuthToken> {
        let remembered = self
            .storage
            .preference(PREVIOUS_AUTH_USER)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %format!("{err:#}"), "failed to read remembered user");
                None
            });
        let Some(email) = remembered.filter(|email| !email.trim().is_empty()) else {
            debug!("no previously authenticated user");
            return no_token_found(event);
        };

        let storage = self.storage.clone();
        let cached = safe_cache_call(self.timeouts.cache, async move {
            storage.account_by_email(&email).await
        })
        .await;
        if matches!(cached, CacheResult::Success(None)) {
            return no_token_found(event);
        }

        let storage = self.storage.clone();
        let handler_event = Arc::clone(&event);
        normalize_cache(cached, &event, move |account: AccountProperties| async move {
            if account.pk.0 > -1 {
                match storage.auth_token_by_pk(account.pk).await {
                    Ok(Some(auth_token)) if auth_token.token.is_some() => {
                        return DataState::data(Some(auth_token), None, handler_event);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %format!("{err:#}"), "failed to read cached token"),
                }
            }
            debug!("cached account has no usable token");
            no_token_found(handler_event)
        })
        .await
    }

    async fn remember_user(&self, email: &str) {
        if let Err(err) = self.storage.set_preference(PREVIOUS_AUTH_USER, email).await {
            warn!(error = %format!("{err:#}"), "failed to remember authenticated user");
        }
    }
}

fn no_token_found(event: SharedEvent) -> DataState<AuthToken> {
    build_error(
        RESPONSE_CHECK_PREVIOUS_AUTH_USER_DONE,
        UiComponentType::None,
        event,
    )
}

pub struct AuthHandler {
    session: SessionContext,
}

impl ViewStateHandler for AuthHandler {
    type Data = AuthToken;
    type ViewState = AuthViewState;

    fn handle_new_data(&self, view_state: &mut AuthViewState, auth_token: AuthToken) {
        if view_state.auth_token.as_ref() == Some(&auth_token) {
            return;
        }
        self.session.login(auth_token.clone());
        view_state.auth_token = Some(auth_token);
    }
}

pub struct AuthViewModel {
    view_model: ViewModel<AuthHandler>,
    repository: Arc<AuthRepository>,
}

impl AuthViewModel {
    pub fn new(repository: AuthRepository, session: SessionContext) -> Self {
        Self {
            view_model: ViewModel::new(AuthHandler { session }),
            repository: Arc::new(repository),
        }
    }

    /// Dispatches `event`. Returns `false` when an identical request is
    /// already running.
    pub fn set_state_event(&self, event: AuthStateEvent) -> bool {
        let shared: SharedEvent = Arc::new(event.clone());
        let repository = Arc::clone(&self.repository);
        let job_event = Arc::clone(&shared);
        self.view_model.launch_job(shared, async move {
            match event {
                AuthStateEvent::Login { email, password } => {
                    repository.attempt_login(job_event, &email, &password).await
                }
                AuthStateEvent::Register {
                    email,
                    username,
                    password,
                    confirm_password,
                } => {
                    let fields = RegistrationFields {
                        email,
                        username,
                        password,
                        confirm_password,
                    };
                    repository.attempt_registration(job_event, &fields).await
                }
                AuthStateEvent::CheckPreviousAuth => {
                    repository.check_previous_auth_user(job_event).await
                }
            }
        })
    }

    pub fn set_login_fields(&self, fields: LoginFields) {
        self.view_model.update_view_state(|state| {
            if state.login_fields != fields {
                state.login_fields = fields;
            }
        });
    }

    pub fn set_registration_fields(&self, fields: RegistrationFields) {
        self.view_model.update_view_state(|state| {
            if state.registration_fields != fields {
                state.registration_fields = fields;
            }
        });
    }

    pub fn view_state(&self) -> AuthViewState {
        self.view_model.view_state()
    }

    pub fn view_model(&self) -> &ViewModel<AuthHandler> {
        &self.view_model
    }

    pub fn cancel_active_jobs(&self) {
        self.view_model.cancel_active_jobs();
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
