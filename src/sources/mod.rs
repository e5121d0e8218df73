//! Remote services the agent retrieves from.
//!
//! Each service sits behind a small trait matching its pagination primitive:
//!
//! - [`CursorApi`]: search once, then read fixed-size batches from a
//!   server-held result set (NCBI Entrez history server).
//! - [`PagedApi`]: request numbered pages of fixed size (Web of Science Starter).
//! - [`EntityApi`]: plain listings with an optional per-item detail call (Galaxy).
//!
//! The fetch engine only talks to these traits, so tests swap in the
//! in-memory implementations from [`mock`].

mod galaxy;
mod ncbi;
mod wos;

pub mod mock;

pub use galaxy::GalaxyClient;
pub use ncbi::NcbiClient;
pub use wos::WosClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{EntityKind, RawPage};

/// Result of a history-enabled search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHandle {
    /// Total number of hits
    pub count: usize,
    /// History server session (`WebEnv`)
    pub web_env: String,
    /// Result set key within the session
    pub query_key: String,
    /// First page of identifiers
    pub ids: Vec<String>,
}

/// What a batch fetch returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFlavour {
    /// Complete records (efetch XML)
    Full,
    /// Document summaries (esummary JSON)
    Summary,
}

/// Search-session style API
#[async_trait]
pub trait CursorApi: Send + Sync + std::fmt::Debug {
    /// Run a search and keep the result set on the server
    async fn search(&self, db: &str, term: &str, retmax: usize)
        -> Result<SearchHandle, SourceError>;

    /// Read `batch_size` records starting at `offset` from a stored result set
    async fn fetch_batch(
        &self,
        db: &str,
        handle: &SearchHandle,
        offset: usize,
        batch_size: usize,
        flavour: BatchFlavour,
    ) -> Result<RawPage, SourceError>;

    /// Link identifiers in `dbfrom` to records in `db`
    async fn link(&self, dbfrom: &str, db: &str, ids: &[String]) -> Result<RawPage, SourceError>;
}

/// One page of a page-number search
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Total hits for the query, as reported by the service
    pub total: usize,
    /// Opaque hit objects, in service order
    pub hits: Vec<Value>,
}

/// Page/limit style API
#[async_trait]
pub trait PagedApi: Send + Sync + std::fmt::Debug {
    async fn search_page(
        &self,
        db: &str,
        term: &str,
        page: usize,
        limit: usize,
    ) -> Result<PageResult, SourceError>;
}

/// Entity listing API
#[async_trait]
pub trait EntityApi: Send + Sync + std::fmt::Debug {
    /// List every entity of `kind`
    async fn list(&self, kind: EntityKind) -> Result<Vec<Value>, SourceError>;

    /// Full details of one history
    async fn show_history(&self, id: &str) -> Result<Value, SourceError>;
}

/// Errors that can occur when talking to a remote service
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The service answered 2xx but the body is unusable
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters or client setup
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The user cancelled the fetch
    #[error("Fetch cancelled")]
    Cancelled,
}

impl SourceError {
    /// HTTP status, when the service sent one
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = SourceError::Status {
            status: 429,
            message: "Too Many Requests".into(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.to_string(), "HTTP 429: Too Many Requests");
        assert_eq!(SourceError::Cancelled.status(), None);
    }
}
