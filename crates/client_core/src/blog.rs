//! Blog search with pagination, plus the single-post operations.

use std::sync::Arc;

use shared::{
    domain::{AuthToken, BlogOrdering, BlogPk, BlogPost},
    protocol::BlogListSearchResponse,
};
use storage::{Storage, BLOG_ORDERING};
use tracing::{debug, warn};

use crate::{
    constants::{
        ERROR_NOT_AUTHENTICATED, ERROR_UNKNOWN, RESPONSE_HAS_PERMISSION_TO_EDIT,
        RESPONSE_MUST_BECOME_MEMBER, RESPONSE_NO_PERMISSION_TO_EDIT, SUCCESS_BLOG_DELETED,
        SUCCESS_BLOG_UPDATED,
    },
    data_state::{build_error, DataState},
    event::{normalize_param, SharedEvent, StateEvent},
    message::{Message, UiComponentType},
    remote::RemoteApi,
    resource::{CacheThenNetworkResource, CallTimeouts},
    result::{safe_api_call, safe_cache_call},
    session::SessionContext,
    unifier::{normalize_cache, normalize_remote},
    view_model::{ViewModel, ViewStateHandler},
};

#[derive(Debug, Clone)]
pub enum BlogStateEvent {
    Search {
        query: String,
        ordering: BlogOrdering,
        page: u32,
    },
    RestoreFromCache {
        query: String,
        ordering: BlogOrdering,
        page: u32,
    },
    CheckAuthor {
        slug: String,
    },
    Delete {
        post: BlogPost,
    },
    Update {
        slug: String,
        title: String,
        body: String,
    },
    Create {
        title: String,
        body: String,
    },
}

impl StateEvent for BlogStateEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Search { .. } => "BlogSearch",
            Self::RestoreFromCache { .. } => "RestoreBlogListFromCache",
            Self::CheckAuthor { .. } => "CheckAuthorOfBlogPost",
            Self::Delete { .. } => "DeleteBlogPost",
            Self::Update { .. } => "UpdateBlogPost",
            Self::Create { .. } => "CreateBlogPost",
        }
    }

    fn error_info(&self) -> String {
        match self {
            Self::Search { .. } => "Error searching for blog posts.",
            Self::RestoreFromCache { .. } => "Unable to restore blog posts from cache.",
            Self::CheckAuthor { .. } => "Error checking if you are the author of this blog post.",
            Self::Delete { .. } => "Error deleting that blog post.",
            Self::Update { .. } => "Error updating that blog post.",
            Self::Create { .. } => "Unable to create a new blog post.",
        }
        .to_string()
    }

    /// Searches are keyed on query and ordering. The page is left out so one
    /// query never has two page loads in flight at once.
    fn dedup_params(&self) -> String {
        match self {
            Self::Search {
                query, ordering, ..
            }
            | Self::RestoreFromCache {
                query, ordering, ..
            } => format!("{}|{}", normalize_param(query), ordering.as_query_param()),
            Self::CheckAuthor { slug } | Self::Update { slug, .. } => slug.clone(),
            Self::Delete { post } => post.slug.clone(),
            Self::Create { .. } => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlogData {
    SearchResults {
        posts: Vec<BlogPost>,
        page: u32,
        query_exhausted: bool,
    },
    Author {
        slug: String,
        is_author: bool,
    },
    Deleted(BlogPk),
    Updated(BlogPost),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlogFields {
    pub posts: Vec<BlogPost>,
    pub search_query: String,
    pub page: u32,
    pub ordering: BlogOrdering,
    pub is_query_exhausted: bool,
}

impl Default for BlogFields {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            search_query: String::new(),
            page: 1,
            ordering: BlogOrdering::default(),
            is_query_exhausted: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewBlogFields {
    pub blog_post: Option<BlogPost>,
    pub is_author: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogViewState {
    pub blog_fields: BlogFields,
    pub view_blog_fields: ViewBlogFields,
}

pub struct BlogRepository {
    remote: Arc<dyn RemoteApi>,
    storage: Storage,
    timeouts: CallTimeouts,
    page_size: u32,
}

impl BlogRepository {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        storage: Storage,
        timeouts: CallTimeouts,
        page_size: u32,
    ) -> Self {
        Self {
            remote,
            storage,
            timeouts,
            page_size: page_size.max(1),
        }
    }

    /// Searches remotely, caches every returned post, then relays the cached
    /// list for pages `1..=page`.
    pub async fn search(
        &self,
        event: SharedEvent,
        auth: AuthToken,
        query: String,
        ordering: BlogOrdering,
        page: u32,
    ) -> DataState<BlogData> {
        let remote = Arc::clone(&self.remote);
        let remote_query = query.clone();
        let remote_call = async move {
            remote
                .search_blog_posts(&auth, &remote_query, ordering, page)
                .await
        };

        let update_storage = self.storage.clone();
        let read_storage = self.storage.clone();
        let page_size = self.page_size;
        let handler_event = Arc::clone(&event);
        CacheThenNetworkResource::new(event, self.timeouts, remote_call)
            .update_cache_with(move |response: BlogListSearchResponse| async move {
                for post in response.into_blog_posts() {
                    if let Err(err) = update_storage.insert_blog_post(&post).await {
                        warn!(pk = post.pk.0, error = %format!("{err:#}"), "failed to cache blog post");
                    }
                }
                anyhow::Ok(())
            })
            .read_cache_with(
                move || async move {
                    read_storage
                        .search_blog_posts(&query, ordering, page, page_size)
                        .await
                        .map(Some)
                },
                move |posts: Vec<BlogPost>| async move {
                    search_results(posts, page, page_size, handler_event)
                },
            )
            .run()
            .await
    }

    pub async fn restore_from_cache(
        &self,
        event: SharedEvent,
        query: String,
        ordering: BlogOrdering,
        page: u32,
    ) -> DataState<BlogData> {
        let storage = self.storage.clone();
        let page_size = self.page_size;
        let cached = safe_cache_call(self.timeouts.cache, async move {
            storage
                .search_blog_posts(&query, ordering, page, page_size)
                .await
                .map(Some)
        })
        .await;
        let handler_event = Arc::clone(&event);
        normalize_cache(cached, &event, move |posts| async move {
            search_results(posts, page, page_size, handler_event)
        })
        .await
    }

    pub async fn is_author(
        &self,
        event: SharedEvent,
        auth: AuthToken,
        slug: String,
    ) -> DataState<BlogData> {
        let result = safe_api_call(
            self.timeouts.network,
            self.remote.is_author_of_blog_post(&auth, &slug),
        )
        .await;
        let success_event = Arc::clone(&event);
        normalize_remote(result, &event, move |response| async move {
            let is_author = match response.response.as_str() {
                RESPONSE_HAS_PERMISSION_TO_EDIT => true,
                RESPONSE_NO_PERMISSION_TO_EDIT => false,
                other => {
                    debug!(response = other, "unexpected author check response");
                    return build_error(ERROR_UNKNOWN, UiComponentType::None, success_event);
                }
            };
            DataState::data(Some(BlogData::Author { slug, is_author }), None, success_event)
        })
        .await
    }

    pub async fn delete(
        &self,
        event: SharedEvent,
        auth: AuthToken,
        post: BlogPost,
    ) -> DataState<BlogData> {
        let result = safe_api_call(
            self.timeouts.network,
            self.remote.delete_blog_post(&auth, &post.slug),
        )
        .await;
        let success_event = Arc::clone(&event);
        normalize_remote(result, &event, move |response| async move {
            if response.response != SUCCESS_BLOG_DELETED {
                return build_error(ERROR_UNKNOWN, UiComponentType::Dialog, success_event);
            }
            if let Err(err) = self.storage.delete_blog_post(post.pk).await {
                warn!(pk = post.pk.0, error = %format!("{err:#}"), "failed to remove cached blog post");
            }
            DataState::data(
                Some(BlogData::Deleted(post.pk)),
                Some(Message::toast_success(response.response)),
                success_event,
            )
        })
        .await
    }

    pub async fn update(
        &self,
        event: SharedEvent,
        auth: AuthToken,
        slug: String,
        title: String,
        body: String,
    ) -> DataState<BlogData> {
        let result = safe_api_call(
            self.timeouts.network,
            self.remote.update_blog_post(&auth, &slug, &title, &body),
        )
        .await;
        let success_event = Arc::clone(&event);
        normalize_remote(result, &event, move |response| async move {
            if response.response != SUCCESS_BLOG_UPDATED {
                return build_error(response.response, UiComponentType::Dialog, success_event);
            }
            let post = response.to_blog_post();
            match self
                .storage
                .update_blog_post(post.pk, &post.title, &post.body, &post.image)
                .await
            {
                Ok(0) => {
                    if let Err(err) = self.storage.insert_blog_post(&post).await {
                        warn!(pk = post.pk.0, error = %format!("{err:#}"), "failed to cache updated blog post");
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(pk = post.pk.0, error = %format!("{err:#}"), "failed to update cached blog post");
                }
            }
            DataState::data(
                Some(BlogData::Updated(post)),
                Some(Message::toast_success(response.response)),
                success_event,
            )
        })
        .await
    }

    pub async fn create(
        &self,
        event: SharedEvent,
        auth: AuthToken,
        title: String,
        body: String,
    ) -> DataState<BlogData> {
        let result = safe_api_call(
            self.timeouts.network,
            self.remote.create_blog_post(&auth, &title, &body),
        )
        .await;
        let success_event = Arc::clone(&event);
        normalize_remote(result, &event, move |response| async move {
            // The server answers 2xx with this text for non-members.
            if response.response != RESPONSE_MUST_BECOME_MEMBER {
                let post = response.to_blog_post();
                if let Err(err) = self.storage.insert_blog_post(&post).await {
                    warn!(pk = post.pk.0, error = %format!("{err:#}"), "failed to cache created blog post");
                }
            }
            DataState::data(
                None,
                Some(Message::dialog_success(response.response)),
                success_event,
            )
        })
        .await
    }

    pub async fn save_ordering(&self, ordering: BlogOrdering) -> anyhow::Result<()> {
        self.storage
            .set_preference(BLOG_ORDERING, ordering.as_query_param())
            .await
    }

    pub async fn saved_ordering(&self) -> anyhow::Result<Option<BlogOrdering>> {
        let raw = self.storage.preference(BLOG_ORDERING).await?;
        Ok(raw.as_deref().and_then(BlogOrdering::from_query_param))
    }
}

fn search_results(
    posts: Vec<BlogPost>,
    page: u32,
    page_size: u32,
    event: SharedEvent,
) -> DataState<BlogData> {
    let expected = u64::from(page.max(1)) * u64::from(page_size);
    let query_exhausted = (posts.len() as u64) < expected;
    DataState::data(
        Some(BlogData::SearchResults {
            posts,
            page,
            query_exhausted,
        }),
        None,
        event,
    )
}

pub struct BlogHandler;

impl ViewStateHandler for BlogHandler {
    type Data = BlogData;
    type ViewState = BlogViewState;

    fn handle_new_data(&self, view_state: &mut BlogViewState, data: BlogData) {
        let BlogViewState {
            blog_fields,
            view_blog_fields,
        } = view_state;
        match data {
            BlogData::SearchResults {
                posts,
                page,
                query_exhausted,
            } => {
                blog_fields.posts = posts;
                blog_fields.page = page;
                blog_fields.is_query_exhausted = query_exhausted;
            }
            BlogData::Author { slug, is_author } => {
                let viewing = view_blog_fields
                    .blog_post
                    .as_ref()
                    .map_or(true, |post| post.slug == slug);
                if viewing {
                    view_blog_fields.is_author = is_author;
                }
            }
            BlogData::Deleted(pk) => {
                blog_fields.posts.retain(|post| post.pk != pk);
                if view_blog_fields
                    .blog_post
                    .as_ref()
                    .is_some_and(|post| post.pk == pk)
                {
                    *view_blog_fields = ViewBlogFields::default();
                }
            }
            BlogData::Updated(updated) => {
                if let Some(post) = blog_fields.posts.iter_mut().find(|post| post.pk == updated.pk) {
                    *post = updated.clone();
                }
                if let Some(post) = view_blog_fields
                    .blog_post
                    .as_mut()
                    .filter(|post| post.pk == updated.pk)
                {
                    *post = updated;
                }
            }
        }
    }
}

pub struct BlogViewModel {
    view_model: ViewModel<BlogHandler>,
    repository: Arc<BlogRepository>,
    session: SessionContext,
}

impl BlogViewModel {
    pub fn new(repository: BlogRepository, session: SessionContext) -> Self {
        Self {
            view_model: ViewModel::new(BlogHandler),
            repository: Arc::new(repository),
            session,
        }
    }

    pub fn set_state_event(&self, event: BlogStateEvent) -> bool {
        let shared: SharedEvent = Arc::new(event.clone());
        let repository = Arc::clone(&self.repository);
        let auth = self.session.authenticated();
        let job_event = Arc::clone(&shared);
        self.view_model.launch_job(shared, async move {
            match (event, auth) {
                (
                    BlogStateEvent::RestoreFromCache {
                        query,
                        ordering,
                        page,
                    },
                    _,
                ) => {
                    repository
                        .restore_from_cache(job_event, query, ordering, page)
                        .await
                }
                (
                    BlogStateEvent::Search {
                        query,
                        ordering,
                        page,
                    },
                    Some(auth),
                ) => repository.search(job_event, auth, query, ordering, page).await,
                (BlogStateEvent::CheckAuthor { slug }, Some(auth)) => {
                    repository.is_author(job_event, auth, slug).await
                }
                (BlogStateEvent::Delete { post }, Some(auth)) => {
                    repository.delete(job_event, auth, post).await
                }
                (BlogStateEvent::Update { slug, title, body }, Some(auth)) => {
                    repository.update(job_event, auth, slug, title, body).await
                }
                (BlogStateEvent::Create { title, body }, Some(auth)) => {
                    repository.create(job_event, auth, title, body).await
                }
                (_, None) => {
                    build_error(ERROR_NOT_AUTHENTICATED, UiComponentType::Dialog, job_event)
                }
            }
        })
    }

    fn search_event(&self, page: u32) -> BlogStateEvent {
        let fields = self.view_model.view_state().blog_fields;
        BlogStateEvent::Search {
            query: fields.search_query,
            ordering: fields.ordering,
            page,
        }
    }

    /// Restarts pagination for the current query and ordering.
    pub fn load_first_page(&self) -> bool {
        self.view_model.update_view_state(|state| {
            state.blog_fields.page = 1;
            state.blog_fields.is_query_exhausted = false;
        });
        self.set_state_event(self.search_event(1))
    }

    /// Requests the next page. Suppressed once the query is exhausted and
    /// while a search for the same query is running.
    pub fn next_page(&self) -> bool {
        let fields = self.view_model.view_state().blog_fields;
        if fields.is_query_exhausted {
            debug!(page = fields.page, "blog query exhausted");
            return false;
        }
        let event = self.search_event(fields.page + 1);
        if self.view_model.orchestrator().is_job_active(&event) {
            return false;
        }
        self.set_state_event(event)
    }

    pub fn refresh_from_cache(&self) -> bool {
        let fields = self.view_model.view_state().blog_fields;
        self.set_state_event(BlogStateEvent::RestoreFromCache {
            query: fields.search_query,
            ordering: fields.ordering,
            page: fields.page,
        })
    }

    pub fn set_query(&self, query: &str) {
        self.view_model
            .update_view_state(|state| state.blog_fields.search_query = query.to_string());
    }

    /// Applies and persists a new ordering.
    pub async fn set_ordering(&self, ordering: BlogOrdering) {
        self.view_model
            .update_view_state(|state| state.blog_fields.ordering = ordering);
        if let Err(err) = self.repository.save_ordering(ordering).await {
            warn!(error = %format!("{err:#}"), "failed to persist blog ordering");
        }
    }

    /// Loads the persisted ordering, if any, into the view state.
    pub async fn restore_ordering(&self) {
        match self.repository.saved_ordering().await {
            Ok(Some(ordering)) => self
                .view_model
                .update_view_state(|state| state.blog_fields.ordering = ordering),
            Ok(None) => {}
            Err(err) => warn!(error = %format!("{err:#}"), "failed to read blog ordering"),
        }
    }

    pub fn view_post(&self, post: BlogPost) {
        self.view_model.update_view_state(|state| {
            state.view_blog_fields = ViewBlogFields {
                blog_post: Some(post),
                is_author: false,
            };
        });
    }

    pub fn check_author(&self, slug: &str) -> bool {
        self.set_state_event(BlogStateEvent::CheckAuthor {
            slug: slug.to_string(),
        })
    }

    pub fn delete(&self, post: BlogPost) -> bool {
        self.set_state_event(BlogStateEvent::Delete { post })
    }

    pub fn update(&self, slug: &str, title: &str, body: &str) -> bool {
        self.set_state_event(BlogStateEvent::Update {
            slug: slug.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        })
    }

    pub fn create(&self, title: &str, body: &str) -> bool {
        self.set_state_event(BlogStateEvent::Create {
            title: title.to_string(),
            body: body.to_string(),
        })
    }

    pub fn view_state(&self) -> BlogViewState {
        self.view_model.view_state()
    }

    pub fn view_model(&self) -> &ViewModel<BlogHandler> {
        &self.view_model
    }

    pub fn cancel_active_jobs(&self) {
        self.view_model.cancel_active_jobs();
    }
}

#[cfg(test)]
#[path = "tests/blog_tests.rs"]
mod tests;
