use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{AccountPk, AccountProperties, AuthToken, BlogOrdering, BlogPk, BlogPost};

/// Preference key remembering the email of the last authenticated account.
pub const PREVIOUS_AUTH_USER: &str = "previous_auth_user";
/// Preference key for the persisted blog list ordering.
pub const BLOG_ORDERING: &str = "blog_ordering";

/// Row id returned by insert helpers when nothing was written.
pub const NOT_WRITTEN: i64 = -1;

const DEFAULT_DATABASE_URL: &str = "sqlite://./data/chores.db";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!(database_url, "cache database ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts or replaces the token for its account. Returns the account pk.
    pub async fn insert_auth_token(&self, auth_token: &AuthToken) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO auth_token (account_pk, token) VALUES (?, ?)
             ON CONFLICT(account_pk) DO UPDATE SET token = excluded.token
             RETURNING account_pk",
        )
        .bind(auth_token.account_pk.0)
        .bind(auth_token.token.as_deref())
        .fetch_optional(&self.pool)
        .await
        .context("failed to persist auth token")?;
        Ok(row.map_or(NOT_WRITTEN, |row| row.get::<i64, _>(0)))
    }

    pub async fn nullify_token(&self, account_pk: AccountPk) -> Result<u64> {
        let result = sqlx::query("UPDATE auth_token SET token = NULL WHERE account_pk = ?")
            .bind(account_pk.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn auth_token_by_pk(&self, account_pk: AccountPk) -> Result<Option<AuthToken>> {
        let row = sqlx::query("SELECT account_pk, token FROM auth_token WHERE account_pk = ?")
            .bind(account_pk.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(AuthToken {
                account_pk: AccountPk(row.try_get("account_pk")?),
                token: row.try_get("token")?,
            })
        })
        .transpose()
    }

    /// Inserts the account unless a row with the same pk or email exists.
    /// Returns [`NOT_WRITTEN`] when the insert was ignored.
    pub async fn insert_or_ignore_account(&self, account: &AccountProperties) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO account_properties (pk, email, username) VALUES (?, ?, ?)
             ON CONFLICT DO NOTHING
             RETURNING pk",
        )
        .bind(account.pk.0)
        .bind(&account.email)
        .bind(&account.username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(NOT_WRITTEN, |row| row.get::<i64, _>(0)))
    }

    pub async fn insert_and_replace_account(&self, account: &AccountProperties) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO account_properties (pk, email, username) VALUES (?, ?, ?)
             ON CONFLICT(pk) DO UPDATE SET email = excluded.email, username = excluded.username
             RETURNING pk",
        )
        .bind(account.pk.0)
        .bind(&account.email)
        .bind(&account.username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(NOT_WRITTEN, |row| row.get::<i64, _>(0)))
    }

    pub async fn account_by_email(&self, email: &str) -> Result<Option<AccountProperties>> {
        let row = sqlx::query("SELECT pk, email, username FROM account_properties WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    pub async fn account_by_pk(&self, pk: AccountPk) -> Result<Option<AccountProperties>> {
        let row = sqlx::query("SELECT pk, email, username FROM account_properties WHERE pk = ?")
            .bind(pk.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    pub async fn update_account(&self, pk: AccountPk, email: &str, username: &str) -> Result<u64> {
        let result =
            sqlx::query("UPDATE account_properties SET email = ?, username = ? WHERE pk = ?")
                .bind(email)
                .bind(username)
                .bind(pk.0)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Inserts or replaces a blog post. Returns the post pk.
    pub async fn insert_blog_post(&self, post: &BlogPost) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO blog_post (pk, title, slug, body, image, date_updated, username)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(pk) DO UPDATE SET
                title = excluded.title,
                slug = excluded.slug,
                body = excluded.body,
                image = excluded.image,
                date_updated = excluded.date_updated,
                username = excluded.username
             RETURNING pk",
        )
        .bind(post.pk.0)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.body)
        .bind(&post.image)
        .bind(post.date_updated)
        .bind(&post.username)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to cache blog post '{}'", post.slug))?;
        Ok(row.map_or(NOT_WRITTEN, |row| row.get::<i64, _>(0)))
    }

    pub async fn delete_blog_post(&self, pk: BlogPk) -> Result<u64> {
        let result = sqlx::query("DELETE FROM blog_post WHERE pk = ?")
            .bind(pk.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_blog_post(
        &self,
        pk: BlogPk,
        title: &str,
        body: &str,
        image: &str,
    ) -> Result<u64> {
        let result =
            sqlx::query("UPDATE blog_post SET title = ?, body = ?, image = ? WHERE pk = ?")
                .bind(title)
                .bind(body)
                .bind(image)
                .bind(pk.0)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn blog_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        let row = sqlx::query(
            "SELECT pk, title, slug, body, image, date_updated, username
             FROM blog_post WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(blog_post_from_row).transpose()
    }

    /// Cached search matching title, body or author, returning every page up
    /// to and including `page` (1-based).
    pub async fn search_blog_posts(
        &self,
        query: &str,
        ordering: BlogOrdering,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<BlogPost>> {
        let limit = i64::from(page.max(1)) * i64::from(page_size);
        let sql = format!(
            "SELECT pk, title, slug, body, image, date_updated, username
             FROM blog_post
             WHERE title LIKE '%' || ?1 || '%'
                OR body LIKE '%' || ?1 || '%'
                OR username LIKE '%' || ?1 || '%'
             ORDER BY {}
             LIMIT ?2",
            order_by_clause(ordering)
        );
        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("cached blog search failed")?;
        rows.iter().map(blog_post_from_row).collect()
    }

    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn preference(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }
}

fn order_by_clause(ordering: BlogOrdering) -> &'static str {
    match ordering {
        BlogOrdering::DateUpdatedDesc => "date_updated DESC, pk DESC",
        BlogOrdering::DateUpdatedAsc => "date_updated ASC, pk ASC",
        BlogOrdering::AuthorDesc => "username DESC, pk DESC",
        BlogOrdering::AuthorAsc => "username ASC, pk ASC",
    }
}

fn account_from_row(row: &SqliteRow) -> Result<AccountProperties> {
    Ok(AccountProperties {
        pk: AccountPk(row.try_get("pk")?),
        email: row.try_get("email")?,
        username: row.try_get("username")?,
    })
}

fn blog_post_from_row(row: &SqliteRow) -> Result<BlogPost> {
    Ok(BlogPost {
        pk: BlogPk(row.try_get("pk")?),
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        body: row.try_get("body")?,
        image: row.try_get("image")?,
        date_updated: row.try_get::<DateTime<Utc>, _>("date_updated")?,
        username: row.try_get("username")?,
    })
}

/// Normalizes a user supplied database location into a sqlx SQLite url and
/// creates its parent directory.
pub fn prepare_database_url(raw_database_url: &str) -> Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
