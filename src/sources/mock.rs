//! In-memory service doubles for testing the fetch engine and the agent.
//!
//! Each mock records the calls it receives so tests can assert on request
//! counts and parameters, not only on the returned records.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::{EntityKind, RawPage};
use crate::sources::{
    BatchFlavour, CursorApi, EntityApi, PageResult, PagedApi, SearchHandle, SourceError,
};

/// One batch request seen by [`MockCursorApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub db: String,
    pub offset: usize,
    pub batch_size: usize,
    pub flavour: BatchFlavour,
}

/// Session-cursor double holding a fixed list of identifiers.
///
/// Batches are generated from the identifier list: full fetches return
/// minimal PubMed article XML, summary fetches return esummary JSON.
#[derive(Debug, Default)]
pub struct MockCursorApi {
    ids: Vec<String>,
    count: Option<usize>,
    fail_on_batch: Option<usize>,
    links: Mutex<Option<Value>>,
    searches: Mutex<Vec<(String, String)>>,
    batches: Mutex<Vec<BatchCall>>,
}

impl MockCursorApi {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Generate `n` sequential identifiers starting at 1000
    pub fn with_count(n: usize) -> Self {
        Self::new((0..n).map(|i| (1000 + i).to_string()))
    }

    /// Report a different total than the identifier list length
    pub fn reporting_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Fail the n-th batch call (0-based) with a 500 status
    pub fn failing_on_batch(mut self, n: usize) -> Self {
        self.fail_on_batch = Some(n);
        self
    }

    /// Set the elink response body
    pub fn set_links(&self, body: Value) {
        let mut guard = self.links.lock().expect("mock lock poisoned");
        *guard = Some(body);
    }

    pub fn searches(&self) -> Vec<(String, String)> {
        self.searches.lock().expect("mock lock poisoned").clone()
    }

    pub fn batches(&self) -> Vec<BatchCall> {
        self.batches.lock().expect("mock lock poisoned").clone()
    }

    fn window(&self, offset: usize, batch_size: usize) -> &[String] {
        let start = offset.min(self.ids.len());
        let end = (offset + batch_size).min(self.ids.len());
        &self.ids[start..end]
    }
}

/// Minimal PubMed article XML for the given PMIDs
pub fn article_xml(ids: &[String]) -> String {
    let mut xml = String::from("<PubmedArticleSet>");
    for id in ids {
        xml.push_str(&format!(
            "<PubmedArticle><MedlineCitation><PMID Version=\"1\">{id}</PMID><Article>\
             <Journal><JournalIssue><PubDate><Year>2024</Year></PubDate></JournalIssue>\
             <Title>Journal {id}</Title></Journal><ArticleTitle>Article {id}</ArticleTitle>\
             <Abstract><AbstractText>Abstract of {id}.</AbstractText></Abstract>\
             </Article></MedlineCitation></PubmedArticle>"
        ));
    }
    xml.push_str("</PubmedArticleSet>");
    xml
}

/// esummary JSON for the given UIDs
pub fn summary_json(ids: &[String]) -> Value {
    let mut result = serde_json::Map::new();
    result.insert("uids".to_string(), json!(ids));
    for id in ids {
        result.insert(
            id.clone(),
            json!({
                "uid": id,
                "title": format!("Summary {}", id),
                "fulljournalname": "Journal of Tests",
                "pubdate": "2023 Jan 5"
            }),
        );
    }
    json!({ "result": result })
}

#[async_trait]
impl CursorApi for MockCursorApi {
    async fn search(
        &self,
        db: &str,
        term: &str,
        retmax: usize,
    ) -> Result<SearchHandle, SourceError> {
        self.searches
            .lock()
            .expect("mock lock poisoned")
            .push((db.to_string(), term.to_string()));
        Ok(SearchHandle {
            count: self.count.unwrap_or(self.ids.len()),
            web_env: "MCID_mock".to_string(),
            query_key: "1".to_string(),
            ids: self.window(0, retmax).to_vec(),
        })
    }

    async fn fetch_batch(
        &self,
        db: &str,
        _handle: &SearchHandle,
        offset: usize,
        batch_size: usize,
        flavour: BatchFlavour,
    ) -> Result<RawPage, SourceError> {
        let call_index = {
            let mut batches = self.batches.lock().expect("mock lock poisoned");
            batches.push(BatchCall {
                db: db.to_string(),
                offset,
                batch_size,
                flavour,
            });
            batches.len() - 1
        };

        if self.fail_on_batch == Some(call_index) {
            return Err(SourceError::Status {
                status: 500,
                message: "mock batch failure".to_string(),
            });
        }

        let ids = self.window(offset, batch_size);
        Ok(match flavour {
            BatchFlavour::Full => RawPage::Xml(article_xml(ids)),
            BatchFlavour::Summary => RawPage::Json(summary_json(ids)),
        })
    }

    async fn link(
        &self,
        _dbfrom: &str,
        _db: &str,
        _ids: &[String],
    ) -> Result<RawPage, SourceError> {
        let guard = self.links.lock().expect("mock lock poisoned");
        Ok(RawPage::Json(
            guard.clone().unwrap_or_else(|| json!({ "linksets": [] })),
        ))
    }
}

/// Page-number double serving slices of a fixed hit list
#[derive(Debug, Default)]
pub struct MockPagedApi {
    hits: Vec<Value>,
    total: Option<usize>,
    over_deliver: usize,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl MockPagedApi {
    /// `n` Web of Science style hits with uids `WOS:0`, `WOS:1`, ...
    pub fn with_hits(n: usize) -> Self {
        let hits = (0..n)
            .map(|i| {
                json!({
                    "uid": format!("WOS:{}", i),
                    "title": format!("Hit {}", i),
                    "source": {"sourceTitle": "Test Journal", "publishYear": 2020 + (i % 5)}
                })
            })
            .collect();
        Self {
            hits,
            ..Self::default()
        }
    }

    /// Report a different total than the hit list length
    pub fn reporting_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Return `extra` more hits than the requested limit on every page
    pub fn over_delivering(mut self, extra: usize) -> Self {
        self.over_deliver = extra;
        self
    }

    /// `(page, limit)` of every call, probe included
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl PagedApi for MockPagedApi {
    async fn search_page(
        &self,
        _db: &str,
        _term: &str,
        page: usize,
        limit: usize,
    ) -> Result<PageResult, SourceError> {
        self.calls.lock().expect("mock lock poisoned").push((page, limit));
        let start = (page.saturating_sub(1) * limit).min(self.hits.len());
        let end = (start + limit + self.over_deliver).min(self.hits.len());
        Ok(PageResult {
            total: self.total.unwrap_or(self.hits.len()),
            hits: self.hits[start..end].to_vec(),
        })
    }
}

/// Entity listing double
#[derive(Debug, Default)]
pub struct MockEntityApi {
    listings: HashMap<EntityKind, Vec<Value>>,
    histories: HashMap<String, Value>,
    detail_calls: Mutex<Vec<String>>,
}

impl MockEntityApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, kind: EntityKind, items: Vec<Value>) -> Self {
        self.listings.insert(kind, items);
        self
    }

    pub fn with_history_details(mut self, id: &str, details: Value) -> Self {
        self.histories.insert(id.to_string(), details);
        self
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl EntityApi for MockEntityApi {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Value>, SourceError> {
        Ok(self.listings.get(&kind).cloned().unwrap_or_default())
    }

    async fn show_history(&self, id: &str) -> Result<Value, SourceError> {
        self.detail_calls.lock().expect("mock lock poisoned").push(id.to_string());
        self.histories.get(id).cloned().ok_or_else(|| SourceError::Status {
            status: 404,
            message: format!("history {} not found", id),
        })
    }
}
