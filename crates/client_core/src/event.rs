//! Logical requests ("events") and their deduplication identity.

use std::{fmt, sync::Arc};

/// Identity used to enforce at most one active operation per logical request.
///
/// `params` holds the normalized parameters that distinguish two requests of
/// the same kind; an empty string makes every request of that kind share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub kind: &'static str,
    pub params: String,
}

impl DedupKey {
    pub fn new(kind: &'static str, params: impl Into<String>) -> Self {
        Self {
            kind,
            params: params.into(),
        }
    }

    pub fn kind_only(kind: &'static str) -> Self {
        Self::new(kind, String::new())
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(self.kind)
        } else {
            write!(f, "{}({})", self.kind, self.params)
        }
    }
}

/// A parameterized request dispatched through an
/// [`Orchestrator`](crate::orchestrator::Orchestrator).
pub trait StateEvent: fmt::Debug + Send + Sync + 'static {
    /// Stable name of the request kind. Safe to log.
    fn kind(&self) -> &'static str;

    /// Human readable prefix for every error this request surfaces.
    fn error_info(&self) -> String;

    /// Normalized parameters that take part in deduplication.
    fn dedup_params(&self) -> String {
        String::new()
    }

    fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.kind(), self.dedup_params())
    }
}

pub type SharedEvent = Arc<dyn StateEvent>;

/// Lowercases and trims a free-form parameter before it becomes part of a key.
pub fn normalize_param(raw: &str) -> String {
    raw.trim().to_lowercase()
}
