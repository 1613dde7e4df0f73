use shared::domain::AccountPk;

use super::*;
use crate::test_support::memory_storage;

#[tokio::test]
async fn logout_nullifies_cached_token_and_clears_session() {
    let storage = memory_storage().await;
    let token = AuthToken::new(AccountPk(4), "abc");
    storage.insert_auth_token(&token).await.expect("cache token");

    let session = SessionContext::new(storage.clone());
    let mut observed = session.subscribe();
    session.login(token.clone());
    assert!(observed.has_changed().expect("alive"));
    assert_eq!(observed.borrow_and_update().clone(), Some(token));

    session.logout().await;
    assert!(session.current().is_none());
    let cached = storage
        .auth_token_by_pk(AccountPk(4))
        .await
        .expect("lookup")
        .expect("row kept");
    assert_eq!(cached.token, None);
}

#[tokio::test]
async fn token_without_credential_is_not_authenticated() {
    let storage = memory_storage().await;
    let session = SessionContext::new(storage);
    session.login(AuthToken {
        account_pk: AccountPk(1),
        token: None,
    });
    assert!(session.current().is_some());
    assert!(session.authenticated().is_none());
}
