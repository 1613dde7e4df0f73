use std::time::Duration;

use chrono::{TimeZone, Utc};
use shared::{
    domain::AccountPk,
    protocol::{BlogCreateUpdateResponse, BlogSearchEntry, GenericResponse},
};

use super::*;
use crate::{
    constants::NETWORK_ERROR,
    result::RemoteResult,
    test_support::{memory_storage, test_timeouts, FakeRemote},
};

fn entry(pk: i64, title: &str, day: u32) -> BlogSearchEntry {
    BlogSearchEntry {
        pk,
        title: title.into(),
        slug: format!("post-{pk}"),
        body: format!("body of {title}"),
        image: String::new(),
        date_updated: Utc
            .with_ymd_and_hms(2024, 11, day, 12, 0, 0)
            .single()
            .expect("valid date"),
        username: "amy".into(),
    }
}

fn auth() -> AuthToken {
    AuthToken::new(AccountPk(1), "tok")
}

fn search_event(query: &str, page: u32) -> SharedEvent {
    Arc::new(BlogStateEvent::Search {
        query: query.into(),
        ordering: BlogOrdering::DateUpdatedDesc,
        page,
    })
}

async fn repository(remote: Arc<FakeRemote>, page_size: u32) -> (BlogRepository, Storage) {
    let storage = memory_storage().await;
    let repository = BlogRepository::new(remote, storage.clone(), test_timeouts(), page_size);
    (repository, storage)
}

fn expect_results(state: &DataState<BlogData>) -> (Vec<String>, bool) {
    match state.payload() {
        Some(BlogData::SearchResults {
            posts,
            query_exhausted,
            ..
        }) => (
            posts.iter().map(|post| post.title.clone()).collect(),
            *query_exhausted,
        ),
        other => panic!("expected search results, got {other:?}"),
    }
}

#[test]
fn pages_of_one_query_share_a_dedup_key() {
    assert_eq!(
        search_event("Rust ", 1).dedup_key(),
        search_event("rust", 4).dedup_key()
    );
    let other_order: SharedEvent = Arc::new(BlogStateEvent::Search {
        query: "rust".into(),
        ordering: BlogOrdering::AuthorAsc,
        page: 1,
    });
    assert_ne!(other_order.dedup_key(), search_event("rust", 1).dedup_key());
}

#[tokio::test]
async fn search_relays_the_cached_list_after_writing_remote_results() {
    let remote = Arc::new(FakeRemote::default());
    *remote.search.lock() = RemoteResult::ok(BlogListSearchResponse {
        results: vec![entry(1, "older", 1), entry(2, "newer", 2)],
        detail: None,
    });
    let (repository, storage) = repository(remote, 2).await;
    // Already cached from an earlier session and not part of this response.
    storage
        .insert_blog_post(&BlogPost::from(entry(3, "newest", 3)))
        .await
        .expect("seed");

    let state = repository
        .search(
            search_event("", 1),
            auth(),
            String::new(),
            BlogOrdering::DateUpdatedDesc,
            1,
        )
        .await;

    let (titles, exhausted) = expect_results(&state);
    assert_eq!(titles, vec!["newest", "newer"]);
    assert!(!exhausted);
    assert!(storage
        .blog_post_by_slug("post-1")
        .await
        .expect("read")
        .is_some());
}

#[tokio::test]
async fn short_page_marks_query_exhausted() {
    let remote = Arc::new(FakeRemote::default());
    *remote.search.lock() = RemoteResult::ok(BlogListSearchResponse {
        results: vec![entry(1, "only", 1)],
        detail: None,
    });
    let (repository, _storage) = repository(remote, 10).await;

    let state = repository
        .search(
            search_event("", 1),
            auth(),
            String::new(),
            BlogOrdering::DateUpdatedDesc,
            1,
        )
        .await;

    let (titles, exhausted) = expect_results(&state);
    assert_eq!(titles, vec!["only"]);
    assert!(exhausted);
}

#[tokio::test]
async fn offline_search_falls_back_to_cache_with_the_network_error() {
    let remote = Arc::new(FakeRemote::default());
    let (repository, storage) = repository(remote, 10).await;
    storage
        .insert_blog_post(&BlogPost::from(entry(4, "cached", 4)))
        .await
        .expect("seed");

    let state = repository
        .search(
            search_event("", 1),
            auth(),
            String::new(),
            BlogOrdering::DateUpdatedDesc,
            1,
        )
        .await;

    let (titles, _) = expect_results(&state);
    assert_eq!(titles, vec!["cached"]);
    assert_eq!(
        state.message().expect("remote error kept").text,
        format!("Error searching for blog posts.\n\nReason: {NETWORK_ERROR}")
    );
}

#[tokio::test]
async fn author_check_maps_permission_responses() {
    let remote = Arc::new(FakeRemote::default());
    *remote.generic.lock() = RemoteResult::ok(GenericResponse {
        response: RESPONSE_HAS_PERMISSION_TO_EDIT.into(),
    });
    let (repository, _storage) = repository(Arc::clone(&remote), 10).await;
    let event: SharedEvent = Arc::new(BlogStateEvent::CheckAuthor {
        slug: "post-1".into(),
    });

    let state = repository
        .is_author(Arc::clone(&event), auth(), "post-1".into())
        .await;
    assert_eq!(
        state.payload(),
        Some(&BlogData::Author {
            slug: "post-1".into(),
            is_author: true
        })
    );

    *remote.generic.lock() = RemoteResult::ok(GenericResponse {
        response: "something else".into(),
    });
    let state = repository.is_author(event, auth(), "post-1".into()).await;
    assert!(state.is_error());
    assert_eq!(state.message().expect("error").text, ERROR_UNKNOWN);
}

#[tokio::test]
async fn delete_removes_the_cached_row_and_toasts() {
    let remote = Arc::new(FakeRemote::default());
    *remote.generic.lock() = RemoteResult::ok(GenericResponse {
        response: SUCCESS_BLOG_DELETED.into(),
    });
    let (repository, storage) = repository(remote, 10).await;
    let post = BlogPost::from(entry(5, "doomed", 5));
    storage.insert_blog_post(&post).await.expect("seed");

    let state = repository
        .delete(
            Arc::new(BlogStateEvent::Delete { post: post.clone() }),
            auth(),
            post,
        )
        .await;

    assert_eq!(state.payload(), Some(&BlogData::Deleted(BlogPk(5))));
    let message = state.message().expect("toast");
    assert_eq!(message.ui_component_type, UiComponentType::Toast);
    assert!(storage
        .blog_post_by_slug("post-5")
        .await
        .expect("read")
        .is_none());
}

#[tokio::test]
async fn non_members_cannot_create_posts() {
    let remote = Arc::new(FakeRemote::default());
    *remote.blog_write.lock() = RemoteResult::ok(refused_create());
    let (repository, storage) = repository(remote, 10).await;

    let state = repository
        .create(
            Arc::new(BlogStateEvent::Create {
                title: "t".into(),
                body: "b".into(),
            }),
            auth(),
            "t".into(),
            "b".into(),
        )
        .await;

    let message = state.message().expect("dialog");
    assert_eq!(message.text, RESPONSE_MUST_BECOME_MEMBER);
    assert_eq!(message.ui_component_type, UiComponentType::Dialog);
    assert!(storage
        .blog_post_by_slug("post-9")
        .await
        .expect("read")
        .is_none());
}

fn refused_create() -> BlogCreateUpdateResponse {
    let post = entry(9, "t", 9);
    BlogCreateUpdateResponse {
        response: RESPONSE_MUST_BECOME_MEMBER.into(),
        pk: post.pk,
        title: post.title,
        slug: post.slug,
        body: post.body,
        image: post.image,
        date_updated: post.date_updated,
        username: post.username,
    }
}

#[test]
fn handler_applies_updates_and_deletions_to_view_state() {
    let first = BlogPost::from(entry(1, "first", 1));
    let second = BlogPost::from(entry(2, "second", 2));
    let mut state = BlogViewState::default();
    state.blog_fields.posts = vec![first.clone(), second.clone()];
    state.view_blog_fields.blog_post = Some(second.clone());

    let renamed = BlogPost {
        title: "renamed".into(),
        ..second.clone()
    };
    BlogHandler.handle_new_data(&mut state, BlogData::Updated(renamed.clone()));
    assert_eq!(state.blog_fields.posts[1], renamed);
    assert_eq!(state.view_blog_fields.blog_post, Some(renamed));

    BlogHandler.handle_new_data(&mut state, BlogData::Deleted(second.pk));
    assert_eq!(state.blog_fields.posts, vec![first]);
    assert_eq!(state.view_blog_fields, ViewBlogFields::default());
}

async fn view_model_with(
    remote: Arc<FakeRemote>,
    page_size: u32,
    logged_in: bool,
) -> BlogViewModel {
    let storage = memory_storage().await;
    let session = SessionContext::new(storage.clone());
    if logged_in {
        session.login(auth());
    }
    let repository = BlogRepository::new(remote, storage, test_timeouts(), page_size);
    BlogViewModel::new(repository, session)
}

async fn settled(view_model: &BlogViewModel) {
    tokio::time::timeout(Duration::from_secs(2), view_model.view_model().settle())
        .await
        .expect("settled");
}

#[tokio::test]
async fn jobs_without_a_session_fail_with_not_authenticated() {
    let view_model = view_model_with(Arc::new(FakeRemote::default()), 10, false).await;

    assert!(view_model.load_first_page());
    settled(&view_model).await;

    let message = view_model.view_model().head_message().expect("error");
    assert_eq!(message.text, ERROR_NOT_AUTHENTICATED);
}

#[tokio::test]
async fn exhausted_query_stops_pagination() {
    let remote = Arc::new(FakeRemote::default());
    *remote.search.lock() = RemoteResult::ok(BlogListSearchResponse {
        results: vec![entry(1, "only", 1)],
        detail: None,
    });
    let view_model = view_model_with(Arc::clone(&remote), 5, true).await;

    assert!(view_model.load_first_page());
    settled(&view_model).await;

    let fields = view_model.view_state().blog_fields;
    assert_eq!(fields.posts.len(), 1);
    assert!(fields.is_query_exhausted);
    assert!(!view_model.next_page());
    assert_eq!(remote.calls(), vec!["search_blog_posts"]);
}

#[tokio::test]
async fn next_page_is_suppressed_while_a_search_runs() {
    let remote = Arc::new(FakeRemote::default());
    *remote.search.lock() = RemoteResult::ok(BlogListSearchResponse {
        results: vec![entry(1, "a", 1), entry(2, "b", 2)],
        detail: None,
    });
    *remote.delay.lock() = Duration::from_millis(50);
    let view_model = view_model_with(Arc::clone(&remote), 2, true).await;

    assert!(view_model.load_first_page());
    assert!(!view_model.next_page());
    settled(&view_model).await;

    assert_eq!(view_model.view_state().blog_fields.page, 1);
    assert!(view_model.next_page());
    settled(&view_model).await;
    assert_eq!(view_model.view_state().blog_fields.page, 2);
}

#[tokio::test]
async fn ordering_preference_survives_a_new_view_model() {
    let storage = memory_storage().await;
    let session = SessionContext::new(storage.clone());
    let first = BlogViewModel::new(
        BlogRepository::new(
            Arc::new(FakeRemote::default()),
            storage.clone(),
            test_timeouts(),
            10,
        ),
        session.clone(),
    );
    first.set_ordering(BlogOrdering::AuthorAsc).await;

    let second = BlogViewModel::new(
        BlogRepository::new(
            Arc::new(FakeRemote::default()),
            storage,
            test_timeouts(),
            10,
        ),
        session,
    );
    assert_eq!(
        second.view_state().blog_fields.ordering,
        BlogOrdering::DateUpdatedDesc
    );
    second.restore_ordering().await;
    assert_eq!(
        second.view_state().blog_fields.ordering,
        BlogOrdering::AuthorAsc
    );
}
