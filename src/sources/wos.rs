//! Web of Science Starter API client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::WosConfig;
use crate::sources::{PageResult, PagedApi, SourceError};
use crate::utils::{send_checked, HttpClient};

const SERVICE: &str = "Web of Science";

/// Starter API client; the sort order is fixed at construction
#[derive(Debug, Clone)]
pub struct WosClient {
    client: HttpClient,
    base_url: String,
    api_key: String,
    sort: String,
}

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    hits: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    total: usize,
}

impl WosClient {
    pub fn new(config: &WosConfig) -> Result<Self, SourceError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SourceError::InvalidRequest("Web of Science API requires an API key".to_string())
            })?;

        Ok(Self {
            client: HttpClient::new()?,
            base_url: config.base_url.clone(),
            api_key,
            sort: config.sort(),
        })
    }

    /// Wrap a term in the topic-search field tag
    pub fn topic_query(term: &str) -> String {
        format!("TS=({})", term)
    }

    fn parse_page(body: &str) -> Result<PageResult, SourceError> {
        let response: DocumentsResponse = serde_json::from_str(body)?;
        Ok(PageResult {
            total: response.metadata.total,
            hits: response.hits,
        })
    }
}

#[async_trait]
impl PagedApi for WosClient {
    #[instrument(skip(self))]
    async fn search_page(
        &self,
        db: &str,
        term: &str,
        page: usize,
        limit: usize,
    ) -> Result<PageResult, SourceError> {
        let params = [
            ("db", db.to_string()),
            ("q", Self::topic_query(term)),
            ("limit", limit.to_string()),
            ("page", page.to_string()),
            ("sortField", self.sort.clone()),
        ];

        debug!("requesting page {}", page);
        let request = self
            .client
            .get(&self.base_url)
            .header("accept", "application/json")
            .header("X-ApiKey", &self.api_key)
            .query(&params);
        let response = send_checked(request, SERVICE).await?;
        let body = response.text().await?;
        Self::parse_page(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base_url: &str) -> WosConfig {
        WosConfig {
            api_key: Some("wos-key".to_string()),
            base_url: base_url.to_string(),
            sort_field: "PY".to_string(),
            ascending: false,
            ..WosConfig::default()
        }
    }

    #[test]
    fn test_topic_query() {
        assert_eq!(WosClient::topic_query("urban gradients"), "TS=(urban gradients)");
    }

    #[test]
    fn test_new_requires_key() {
        assert!(WosClient::new(&WosConfig::default()).is_err());
    }

    #[test]
    fn test_parse_page_without_metadata() {
        let page = WosClient::parse_page(r#"{"hits":[]}"#).unwrap();
        assert_eq!(page.total, 0);
        assert!(page.hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_page_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/documents")
            .match_header("X-ApiKey", "wos-key")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "WOS".into()),
                Matcher::UrlEncoded("q".into(), "TS=(urban gradients)".into()),
                Matcher::UrlEncoded("limit".into(), "50".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("sortField".into(), "PY D".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"metadata":{"total":61,"page":2,"limit":50},"hits":[{"uid":"WOS:1"}]}"#)
            .create_async()
            .await;

        let client = WosClient::new(&config(&format!("{}/documents", server.url()))).unwrap();
        let page = client
            .search_page("WOS", "urban gradients", 2, 50)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.total, 61);
        assert_eq!(page.hits.len(), 1);
    }

    #[tokio::test]
    async fn test_search_page_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/documents")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message":"Invalid API key"}"#)
            .create_async()
            .await;

        let client = WosClient::new(&config(&format!("{}/documents", server.url()))).unwrap();
        let err = client.search_page("WOS", "x", 1, 1).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}
