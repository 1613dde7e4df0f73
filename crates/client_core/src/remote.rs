//! Remote API collaborator.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{AccountProperties, AuthToken, BlogOrdering},
    error::ErrorResponse,
    protocol::{
        BlogCreateUpdateResponse, BlogListSearchResponse, GenericResponse, LoginResponse,
        RegistrationResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{constants::ERROR_NOT_AUTHENTICATED, result::RemoteResult};

/// Remote calls used by the repositories. Implementations never fail with
/// a Rust error; every failure is a [`RemoteResult`] error variant.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> RemoteResult<LoginResponse>;

    async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        password2: &str,
    ) -> RemoteResult<RegistrationResponse>;

    async fn search_blog_posts(
        &self,
        auth: &AuthToken,
        query: &str,
        ordering: BlogOrdering,
        page: u32,
    ) -> RemoteResult<BlogListSearchResponse>;

    async fn is_author_of_blog_post(
        &self,
        auth: &AuthToken,
        slug: &str,
    ) -> RemoteResult<GenericResponse>;

    async fn delete_blog_post(&self, auth: &AuthToken, slug: &str) -> RemoteResult<GenericResponse>;

    async fn update_blog_post(
        &self,
        auth: &AuthToken,
        slug: &str,
        title: &str,
        body: &str,
    ) -> RemoteResult<BlogCreateUpdateResponse>;

    async fn create_blog_post(
        &self,
        auth: &AuthToken,
        title: &str,
        body: &str,
    ) -> RemoteResult<BlogCreateUpdateResponse>;

    async fn get_account_properties(&self, auth: &AuthToken) -> RemoteResult<AccountProperties>;

    async fn save_account_properties(
        &self,
        auth: &AuthToken,
        email: &str,
        username: &str,
    ) -> RemoteResult<GenericResponse>;

    async fn change_password(
        &self,
        auth: &AuthToken,
        current_password: &str,
        new_password: &str,
        confirm_new_password: &str,
    ) -> RemoteResult<GenericResponse>;
}

/// [`RemoteApi`] over HTTP. Timeouts are applied by the callers through
/// [`safe_api_call`](crate::result::safe_api_call).
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    http: Client,
    base_url: Url,
}

impl HttpRemoteApi {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        let mut raw = server_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url =
            Url::parse(&raw).with_context(|| format!("invalid server url '{server_url}'"))?;
        let http = Client::builder()
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| format!("invalid endpoint '{path}': {err}"))?;
        Ok(self.http.request(method, url))
    }

    fn authorized(
        &self,
        method: Method,
        path: &str,
        auth: &AuthToken,
    ) -> Result<RequestBuilder, String> {
        let header = auth
            .header_value()
            .ok_or_else(|| ERROR_NOT_AUTHENTICATED.to_string())?;
        Ok(self.request(method, path)?.header(AUTHORIZATION, header))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: Result<RequestBuilder, String>,
    ) -> RemoteResult<T> {
        let request = match request.and_then(|builder| builder.build().map_err(|e| e.to_string()))
        {
            Ok(request) => request,
            Err(reason) => return RemoteResult::GenericError(reason),
        };
        let path = request.url().path().to_string();

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%path, error = %err, "remote request failed");
                return RemoteResult::TransportError;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorResponse>().await.unwrap_or_default();
            let reason = body
                .reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("server returned {status}"));
            debug!(%path, %status, "remote request rejected");
            return RemoteResult::GenericError(reason);
        }

        match response.json::<Option<T>>().await {
            Ok(body) => RemoteResult::Success(body),
            Err(err) => {
                warn!(%path, error = %err, "failed to decode remote response");
                RemoteResult::TransportError
            }
        }
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn login(&self, email: &str, password: &str) -> RemoteResult<LoginResponse> {
        let request = self
            .request(Method::POST, "account/login")
            .map(|builder| builder.form(&[("username", email), ("password", password)]));
        self.send(request).await
    }

    async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        password2: &str,
    ) -> RemoteResult<RegistrationResponse> {
        let request = self.request(Method::POST, "account/register").map(|builder| {
            builder.form(&[
                ("email", email),
                ("username", username),
                ("password", password),
                ("password2", password2),
            ])
        });
        self.send(request).await
    }

    async fn search_blog_posts(
        &self,
        auth: &AuthToken,
        query: &str,
        ordering: BlogOrdering,
        page: u32,
    ) -> RemoteResult<BlogListSearchResponse> {
        let page = page.max(1).to_string();
        let request = self
            .authorized(Method::GET, "blog/list", auth)
            .map(|builder| {
                builder.query(&[
                    ("search", query),
                    ("ordering", ordering.as_query_param()),
                    ("page", page.as_str()),
                ])
            });
        self.send(request).await
    }

    async fn is_author_of_blog_post(
        &self,
        auth: &AuthToken,
        slug: &str,
    ) -> RemoteResult<GenericResponse> {
        let request = self.authorized(Method::GET, &format!("blog/{slug}/is_author"), auth);
        self.send(request).await
    }

    async fn delete_blog_post(&self, auth: &AuthToken, slug: &str) -> RemoteResult<GenericResponse> {
        let request = self.authorized(Method::DELETE, &format!("blog/{slug}/delete"), auth);
        self.send(request).await
    }

    async fn update_blog_post(
        &self,
        auth: &AuthToken,
        slug: &str,
        title: &str,
        body: &str,
    ) -> RemoteResult<BlogCreateUpdateResponse> {
        let request = self
            .authorized(Method::PUT, &format!("blog/{slug}/update"), auth)
            .map(|builder| builder.form(&[("title", title), ("body", body)]));
        self.send(request).await
    }

    async fn create_blog_post(
        &self,
        auth: &AuthToken,
        title: &str,
        body: &str,
    ) -> RemoteResult<BlogCreateUpdateResponse> {
        let request = self
            .authorized(Method::POST, "blog/create", auth)
            .map(|builder| builder.form(&[("title", title), ("body", body)]));
        self.send(request).await
    }

    async fn get_account_properties(&self, auth: &AuthToken) -> RemoteResult<AccountProperties> {
        let request = self.authorized(Method::GET, "account/properties", auth);
        self.send(request).await
    }

    async fn save_account_properties(
        &self,
        auth: &AuthToken,
        email: &str,
        username: &str,
    ) -> RemoteResult<GenericResponse> {
        let request = self
            .authorized(Method::PUT, "account/properties/update", auth)
            .map(|builder| builder.form(&[("email", email), ("username", username)]));
        self.send(request).await
    }

    async fn change_password(
        &self,
        auth: &AuthToken,
        current_password: &str,
        new_password: &str,
        confirm_new_password: &str,
    ) -> RemoteResult<GenericResponse> {
        let request = self
            .authorized(Method::PUT, "account/change_password", auth)
            .map(|builder| {
                builder.form(&[
                    ("old_password", current_password),
                    ("new_password", new_password),
                    ("confirm_new_password", confirm_new_password),
                ])
            });
        self.send(request).await
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
