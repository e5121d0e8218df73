//! Fetch session state and fetch outcomes.

use serde::{Deserialize, Serialize};

use super::{ActionKind, EntityKind, ResultSet};

/// Where the next request of an in-progress retrieval starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Server-held result set (NCBI history server), read by offset
    Cursor {
        web_env: String,
        query_key: String,
        offset: usize,
        batch_size: usize,
    },
    /// Numbered pages of fixed size
    Page { page: usize, page_size: usize },
}

/// State of one retrieval, owned by the engine call that created it
#[derive(Debug, Clone)]
pub struct FetchSession {
    /// Total hits reported by the first search call
    pub total: usize,
    /// Records (or raw hits) retrieved so far
    pub fetched: usize,
    /// Requests issued after the initial search
    pub requests: usize,
    pub continuation: Continuation,
    pub origin: ActionKind,
}

impl FetchSession {
    pub fn cursor(
        origin: ActionKind,
        total: usize,
        web_env: String,
        query_key: String,
        batch_size: usize,
    ) -> Self {
        Self {
            total,
            fetched: 0,
            requests: 0,
            continuation: Continuation::Cursor {
                web_env,
                query_key,
                offset: 0,
                batch_size,
            },
            origin,
        }
    }

    pub fn paged(origin: ActionKind, total: usize, page_size: usize) -> Self {
        Self {
            total,
            fetched: 0,
            requests: 0,
            continuation: Continuation::Page { page: 1, page_size },
            origin,
        }
    }

    /// Record a completed request of `count` items and move the continuation on
    pub fn advance(&mut self, count: usize) {
        self.fetched += count;
        self.requests += 1;
        match &mut self.continuation {
            Continuation::Cursor {
                offset, batch_size, ..
            } => *offset += *batch_size,
            Continuation::Page { page, .. } => *page += 1,
        }
    }
}

/// A raw response body, kept until normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawPage {
    /// XML document (Entrez efetch)
    Xml(String),
    /// JSON document (esummary, elink, Web of Science, Galaxy)
    Json(serde_json::Value),
}

/// A cap stopped retrieval before every available record was fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    /// Hits the service reported
    pub available: usize,
    /// Hits actually retrieved
    pub retrieved: usize,
    /// What was capped: records or pages
    pub cap: Cap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cap {
    Records(usize),
    Pages(usize),
}

impl std::fmt::Display for Truncation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cap {
            Cap::Records(limit) => write!(
                f,
                "retrieved {} of {} results (record cap {})",
                self.retrieved, self.available, limit
            ),
            Cap::Pages(limit) => write!(
                f,
                "retrieved {} of {} results (page cap {})",
                self.retrieved, self.available, limit
            ),
        }
    }
}

/// Layout of the raw pages, which selects the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// PubMed efetch article XML
    Articles,
    /// esummary JSON documents
    Summaries,
    /// Web of Science hit arrays
    WosHits,
    /// elink linksets
    Links,
    /// Galaxy entity arrays
    Entities(EntityKind),
}

/// Raw pages of a completed retrieval, in fetch order
#[derive(Debug, Clone)]
pub struct RawFetch {
    pub payload: Payload,
    pub pages: Vec<RawPage>,
    pub total: usize,
    pub truncation: Option<Truncation>,
}

impl RawFetch {
    pub fn empty(payload: Payload) -> Self {
        Self {
            payload,
            pages: Vec::new(),
            total: 0,
            truncation: None,
        }
    }
}

/// Normalized result of one command's retrieval
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: ResultSet,
    pub total: usize,
    pub truncation: Option<Truncation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_advance() {
        let mut session = FetchSession::cursor(
            ActionKind::FetchFull,
            250,
            "MCID_1".into(),
            "1".into(),
            100,
        );
        session.advance(100);
        session.advance(100);
        assert_eq!(session.fetched, 200);
        assert_eq!(session.requests, 2);
        match session.continuation {
            Continuation::Cursor { offset, .. } => assert_eq!(offset, 200),
            _ => panic!("Expected cursor continuation"),
        }
    }

    #[test]
    fn test_page_advance() {
        let mut session = FetchSession::paged(ActionKind::Search, 120, 50);
        session.advance(50);
        assert_eq!(session.continuation, Continuation::Page { page: 2, page_size: 50 });
    }

    #[test]
    fn test_truncation_display() {
        let t = Truncation {
            available: 5000,
            retrieved: 1000,
            cap: Cap::Records(1000),
        };
        assert_eq!(t.to_string(), "retrieved 1000 of 5000 results (record cap 1000)");
    }
}
