use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{
    domain::{AccountProperties, AuthToken, BlogOrdering},
    protocol::{
        BlogCreateUpdateResponse, BlogListSearchResponse, GenericResponse, LoginResponse,
        RegistrationResponse,
    },
};
use storage::Storage;

use crate::{
    event::{SharedEvent, StateEvent},
    remote::RemoteApi,
    resource::CallTimeouts,
    result::RemoteResult,
};

#[derive(Debug)]
pub struct ProbeEvent {
    pub name: &'static str,
    pub params: String,
}

impl StateEvent for ProbeEvent {
    fn kind(&self) -> &'static str {
        self.name
    }

    fn error_info(&self) -> String {
        format!("Error running {}", self.name)
    }

    fn dedup_params(&self) -> String {
        self.params.clone()
    }
}

pub fn probe(name: &'static str) -> SharedEvent {
    probe_with(name, "")
}

pub fn probe_with(name: &'static str, params: &str) -> SharedEvent {
    Arc::new(ProbeEvent {
        name,
        params: params.to_string(),
    })
}

/// Scripted [`RemoteApi`]. Every unscripted call answers with a transport
/// error, and every call is recorded by name.
pub struct FakeRemote {
    pub login: Mutex<RemoteResult<LoginResponse>>,
    pub register: Mutex<RemoteResult<RegistrationResponse>>,
    pub search: Mutex<RemoteResult<BlogListSearchResponse>>,
    pub generic: Mutex<RemoteResult<GenericResponse>>,
    pub blog_write: Mutex<RemoteResult<BlogCreateUpdateResponse>>,
    pub account: Mutex<RemoteResult<AccountProperties>>,
    pub delay: Mutex<Duration>,
    calls: Mutex<Vec<&'static str>>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self {
            login: Mutex::new(RemoteResult::TransportError),
            register: Mutex::new(RemoteResult::TransportError),
            search: Mutex::new(RemoteResult::TransportError),
            generic: Mutex::new(RemoteResult::TransportError),
            blog_write: Mutex::new(RemoteResult::TransportError),
            account: Mutex::new(RemoteResult::TransportError),
            delay: Mutex::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRemote {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    async fn answer<T: Clone>(
        &self,
        name: &'static str,
        slot: &Mutex<RemoteResult<T>>,
    ) -> RemoteResult<T> {
        self.calls.lock().push(name);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        slot.lock().clone()
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn login(&self, _email: &str, _password: &str) -> RemoteResult<LoginResponse> {
        self.answer("login", &self.login).await
    }

    async fn register(
        &self,
        _email: &str,
        _username: &str,
        _password: &str,
        _password2: &str,
    ) -> RemoteResult<RegistrationResponse> {
        self.answer("register", &self.register).await
    }

    async fn search_blog_posts(
        &self,
        _auth: &AuthToken,
        _query: &str,
        _ordering: BlogOrdering,
        _page: u32,
    ) -> RemoteResult<BlogListSearchResponse> {
        self.answer("search_blog_posts", &self.search).await
    }

    async fn is_author_of_blog_post(
        &self,
        _auth: &AuthToken,
        _slug: &str,
    ) -> RemoteResult<GenericResponse> {
        self.answer("is_author_of_blog_post", &self.generic).await
    }

    async fn delete_blog_post(&self, _auth: &AuthToken, _slug: &str) -> RemoteResult<GenericResponse> {
        self.answer("delete_blog_post", &self.generic).await
    }

    async fn update_blog_post(
        &self,
        _auth: &AuthToken,
        _slug: &str,
        _title: &str,
        _body: &str,
    ) -> RemoteResult<BlogCreateUpdateResponse> {
        self.answer("update_blog_post", &self.blog_write).await
    }

    async fn create_blog_post(
        &self,
        _auth: &AuthToken,
        _title: &str,
        _body: &str,
    ) -> RemoteResult<BlogCreateUpdateResponse> {
        self.answer("create_blog_post", &self.blog_write).await
    }

    async fn get_account_properties(&self, _auth: &AuthToken) -> RemoteResult<AccountProperties> {
        self.answer("get_account_properties", &self.account).await
    }

    async fn save_account_properties(
        &self,
        _auth: &AuthToken,
        _email: &str,
        _username: &str,
    ) -> RemoteResult<GenericResponse> {
        self.answer("save_account_properties", &self.generic).await
    }

    async fn change_password(
        &self,
        _auth: &AuthToken,
        _current_password: &str,
        _new_password: &str,
        _confirm_new_password: &str,
    ) -> RemoteResult<GenericResponse> {
        self.answer("change_password", &self.generic).await
    }
}

pub async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("in-memory storage")
}

/// Timeouts generous enough for the fake collaborators.
pub fn test_timeouts() -> CallTimeouts {
    CallTimeouts {
        network: Duration::from_secs(2),
        cache: Duration::from_secs(2),
    }
}
