use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountPk, AuthToken, BlogPk, BlogPost};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub response: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub pk: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

impl LoginResponse {
    pub fn auth_token(&self) -> Option<AuthToken> {
        Some(AuthToken::new(AccountPk(self.pk?), self.token.clone()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub response: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub pk: Option<i64>,
    #[serde(default)]
    pub token: Option<String>,
}

impl RegistrationResponse {
    pub fn auth_token(&self) -> Option<AuthToken> {
        Some(AuthToken::new(AccountPk(self.pk?), self.token.clone()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericResponse {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogSearchEntry {
    pub pk: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    #[serde(default)]
    pub image: String,
    pub date_updated: DateTime<Utc>,
    pub username: String,
}

impl From<BlogSearchEntry> for BlogPost {
    fn from(entry: BlogSearchEntry) -> Self {
        Self {
            pk: BlogPk(entry.pk),
            title: entry.title,
            slug: entry.slug,
            body: entry.body,
            image: entry.image,
            date_updated: entry.date_updated,
            username: entry.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogListSearchResponse {
    #[serde(default)]
    pub results: Vec<BlogSearchEntry>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl BlogListSearchResponse {
    pub fn into_blog_posts(self) -> Vec<BlogPost> {
        self.results.into_iter().map(BlogPost::from).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogCreateUpdateResponse {
    pub response: String,
    pub pk: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    #[serde(default)]
    pub image: String,
    pub date_updated: DateTime<Utc>,
    pub username: String,
}

impl BlogCreateUpdateResponse {
    pub fn to_blog_post(&self) -> BlogPost {
        BlogPost {
            pk: BlogPk(self.pk),
            title: self.title.clone(),
            slug: self.slug.clone(),
            body: self.body.clone(),
            image: self.image.clone(),
            date_updated: self.date_updated,
            username: self.username.clone(),
        }
    }
}
