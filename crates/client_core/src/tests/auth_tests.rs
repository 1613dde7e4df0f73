use std::time::Duration;

use shared::{domain::AccountPk, protocol::LoginResponse};

use super::*;
use crate::{
    constants::NETWORK_ERROR,
    message::MessageType,
    result::RemoteResult,
    test_support::{memory_storage, test_timeouts, FakeRemote},
};

fn login_event(email: &str, password: &str) -> SharedEvent {
    Arc::new(AuthStateEvent::Login {
        email: email.into(),
        password: password.into(),
    })
}

fn accepted_login(pk: i64, token: &str, email: &str) -> RemoteResult<LoginResponse> {
    RemoteResult::ok(LoginResponse {
        response: "Successfully authenticated.".into(),
        error_message: None,
        token: Some(token.into()),
        pk: Some(pk),
        email: Some(email.into()),
    })
}

async fn repository_with(remote: Arc<FakeRemote>) -> (AuthRepository, Storage) {
    let storage = memory_storage().await;
    let repository = AuthRepository::new(remote, storage.clone(), test_timeouts());
    (repository, storage)
}

#[test]
fn debug_output_never_contains_passwords() {
    let event = AuthStateEvent::Register {
        email: "amy@example.com".into(),
        username: "amy".into(),
        password: "hunter2".into(),
        confirm_password: "hunter2".into(),
    };
    let rendered = format!("{event:?}");
    assert!(rendered.contains("amy@example.com"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn login_dedup_ignores_email_case_and_password() {
    let first = login_event(" Amy@Example.com", "one");
    let second = login_event("amy@example.com", "two");
    assert_eq!(first.dedup_key(), second.dedup_key());
}

#[tokio::test]
async fn successful_login_caches_token_and_remembers_user() {
    let remote = Arc::new(FakeRemote::default());
    *remote.login.lock() = accepted_login(3, "tok", "amy@example.com");
    let (repository, storage) = repository_with(remote).await;

    let state = repository
        .attempt_login(login_event("amy@example.com", "pw"), "amy@example.com", "pw")
        .await;

    let token = state.payload().cloned().expect("token relayed");
    assert_eq!(token, AuthToken::new(AccountPk(3), "tok"));
    assert_eq!(
        storage.auth_token_by_pk(AccountPk(3)).await.expect("read"),
        Some(token)
    );
    assert_eq!(
        storage.preference(PREVIOUS_AUTH_USER).await.expect("read"),
        Some("amy@example.com".to_string())
    );
}

#[tokio::test]
async fn rejected_credentials_surface_without_prefix() {
    let remote = Arc::new(FakeRemote::default());
    *remote.login.lock() = RemoteResult::ok(LoginResponse {
        response: GENERIC_AUTH_ERROR.into(),
        error_message: Some("Invalid credentials".into()),
        token: None,
        pk: None,
        email: None,
    });
    let (repository, _storage) = repository_with(remote).await;

    let state = repository
        .attempt_login(login_event("amy@example.com", "bad"), "amy@example.com", "bad")
        .await;

    let message = state.message().expect("error message");
    assert!(state.is_error());
    assert_eq!(message.text, INVALID_CREDENTIALS);
    assert_eq!(message.ui_component_type, UiComponentType::Dialog);
}

#[tokio::test]
async fn blank_fields_never_reach_the_remote() {
    let remote = Arc::new(FakeRemote::default());
    let (repository, _storage) = repository_with(Arc::clone(&remote)).await;

    let state = repository
        .attempt_login(login_event("", "pw"), "", "pw")
        .await;

    assert_eq!(
        state.message().expect("error").text,
        "You can't leave any fields blank."
    );
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn transport_failure_is_prefixed_with_error_info() {
    let remote = Arc::new(FakeRemote::default());
    let (repository, _storage) = repository_with(remote).await;

    let state = repository
        .attempt_login(login_event("amy@example.com", "pw"), "amy@example.com", "pw")
        .await;

    assert_eq!(
        state.message().expect("error").text,
        format!("Login attempt failed.\n\nReason: {NETWORK_ERROR}")
    );
}

#[tokio::test]
async fn registration_server_error_is_shown_verbatim() {
    let remote = Arc::new(FakeRemote::default());
    *remote.register.lock() = RemoteResult::ok(shared::protocol::RegistrationResponse {
        response: GENERIC_AUTH_ERROR.into(),
        error_message: Some("That email is already in use.".into()),
        email: None,
        username: None,
        pk: None,
        token: None,
    });
    let (repository, _storage) = repository_with(remote).await;
    let fields = RegistrationFields {
        email: "amy@example.com".into(),
        username: "amy".into(),
        password: "pw".into(),
        confirm_password: "pw".into(),
    };

    let event: SharedEvent = Arc::new(AuthStateEvent::Register {
        email: fields.email.clone(),
        username: fields.username.clone(),
        password: fields.password.clone(),
        confirm_password: fields.confirm_password.clone(),
    });

    let state = repository.attempt_registration(event, &fields).await;

    assert_eq!(
        state.message().expect("error").text,
        "That email is already in use."
    );
}

#[tokio::test]
async fn previous_user_is_restored_from_cache() {
    let remote = Arc::new(FakeRemote::default());
    let (repository, storage) = repository_with(Arc::clone(&remote)).await;
    storage
        .insert_and_replace_account(&AccountProperties {
            pk: AccountPk(8),
            email: "amy@example.com".into(),
            username: "amy".into(),
        })
        .await
        .expect("account");
    storage
        .insert_auth_token(&AuthToken::new(AccountPk(8), "cached"))
        .await
        .expect("token");
    storage
        .set_preference(PREVIOUS_AUTH_USER, "amy@example.com")
        .await
        .expect("preference");

    let state = repository
        .check_previous_auth_user(Arc::new(AuthStateEvent::CheckPreviousAuth))
        .await;

    assert_eq!(state.payload(), Some(&AuthToken::new(AccountPk(8), "cached")));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn missing_previous_user_finishes_silently() {
    let (repository, _storage) = repository_with(Arc::new(FakeRemote::default())).await;

    let state = repository
        .check_previous_auth_user(Arc::new(AuthStateEvent::CheckPreviousAuth))
        .await;

    let message = state.message().expect("done message");
    assert_eq!(message.text, RESPONSE_CHECK_PREVIOUS_AUTH_USER_DONE);
    assert_eq!(message.message_type, MessageType::Error);
    assert_eq!(message.ui_component_type, UiComponentType::None);
}

#[tokio::test]
async fn logged_out_token_is_not_restored() {
    let (repository, storage) = repository_with(Arc::new(FakeRemote::default())).await;
    storage
        .insert_and_replace_account(&AccountProperties {
            pk: AccountPk(2),
            email: "bo@example.com".into(),
            username: "bo".into(),
        })
        .await
        .expect("account");
    storage
        .insert_auth_token(&AuthToken::new(AccountPk(2), "old"))
        .await
        .expect("token");
    storage.nullify_token(AccountPk(2)).await.expect("nullify");
    storage
        .set_preference(PREVIOUS_AUTH_USER, "bo@example.com")
        .await
        .expect("preference");

    let state = repository
        .check_previous_auth_user(Arc::new(AuthStateEvent::CheckPreviousAuth))
        .await;

    assert!(state.is_error());
    assert_eq!(
        state.message().expect("done").text,
        RESPONSE_CHECK_PREVIOUS_AUTH_USER_DONE
    );
}

#[tokio::test]
async fn view_model_logs_the_session_in_and_suppresses_duplicates() {
    let remote = Arc::new(FakeRemote::default());
    *remote.login.lock() = accepted_login(5, "tok", "amy@example.com");
    *remote.delay.lock() = Duration::from_millis(50);
    let storage = memory_storage().await;
    let session = SessionContext::new(storage.clone());
    let repository = AuthRepository::new(remote.clone(), storage, test_timeouts());
    let view_model = AuthViewModel::new(repository, session.clone());

    let login = AuthStateEvent::Login {
        email: "amy@example.com".into(),
        password: "pw".into(),
    };
    assert!(view_model.set_state_event(login.clone()));
    assert!(!view_model.set_state_event(login));
    assert_eq!(view_model.view_model().active_count(), 1);

    tokio::time::timeout(Duration::from_secs(2), view_model.view_model().settle())
        .await
        .expect("settled");

    assert_eq!(remote.calls(), vec!["login"]);
    let expected = AuthToken::new(AccountPk(5), "tok");
    assert_eq!(view_model.view_state().auth_token, Some(expected.clone()));
    assert_eq!(session.authenticated(), Some(expected));
}

#[tokio::test]
async fn field_updates_are_kept_in_view_state() {
    let storage = memory_storage().await;
    let session = SessionContext::new(storage.clone());
    let repository = AuthRepository::new(
        Arc::new(FakeRemote::default()),
        storage,
        test_timeouts(),
    );
    let view_model = AuthViewModel::new(repository, session);
    let fields = LoginFields {
        email: "amy@example.com".into(),
        password: String::new(),
    };

    view_model.set_login_fields(fields.clone());

    assert_eq!(view_model.view_state().login_fields, fields);
}
