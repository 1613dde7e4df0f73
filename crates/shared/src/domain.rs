use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(AccountPk);
id_newtype!(BlogPk);

/// Token issued by the server on login or registration.
///
/// A `None` token means the account was logged out on this device and the
/// row is kept only so the account can be recognised again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub account_pk: AccountPk,
    pub token: Option<String>,
}

impl AuthToken {
    pub fn new(account_pk: AccountPk, token: impl Into<String>) -> Self {
        Self {
            account_pk,
            token: Some(token.into()),
        }
    }

    pub fn header_value(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Token {token}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProperties {
    pub pk: AccountPk,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub pk: BlogPk,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub image: String,
    pub date_updated: DateTime<Utc>,
    pub username: String,
}

/// Sort order shared by the remote search endpoint and the cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlogOrdering {
    #[default]
    DateUpdatedDesc,
    DateUpdatedAsc,
    AuthorDesc,
    AuthorAsc,
}

impl BlogOrdering {
    /// Value of the `ordering` query parameter understood by the server.
    pub fn as_query_param(self) -> &'static str {
        match self {
            Self::DateUpdatedDesc => "-date_updated",
            Self::DateUpdatedAsc => "date_updated",
            Self::AuthorDesc => "-author__username",
            Self::AuthorAsc => "author__username",
        }
    }

    pub fn from_query_param(raw: &str) -> Option<Self> {
        match raw.trim() {
            "-date_updated" => Some(Self::DateUpdatedDesc),
            "date_updated" => Some(Self::DateUpdatedAsc),
            "-author__username" => Some(Self::AuthorDesc),
            "author__username" => Some(Self::AuthorAsc),
            _ => None,
        }
    }
}
