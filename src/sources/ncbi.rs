//! NCBI Entrez E-utilities client (esearch, efetch, esummary, elink).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::config::NcbiConfig;
use crate::models::RawPage;
use crate::sources::{BatchFlavour, CursorApi, SearchHandle, SourceError};
use crate::utils::{send_checked, HttpClient};

const SERVICE: &str = "NCBI Entrez";

/// Entrez client configured once at construction
#[derive(Debug, Clone)]
pub struct NcbiClient {
    client: HttpClient,
    base_url: String,
    email: String,
    api_key: Option<String>,
    tool: String,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    esearchresult: ESearchData,
}

#[derive(Debug, Deserialize)]
struct ESearchData {
    #[serde(default, rename = "ERROR")]
    error: Option<String>,
    #[serde(default)]
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(default)]
    webenv: Option<String>,
    #[serde(default, rename = "querykey")]
    query_key: Option<String>,
}

impl NcbiClient {
    /// Create a client. Entrez requires a contact email on every request.
    pub fn new(config: &NcbiConfig) -> Result<Self, SourceError> {
        let email = config
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                SourceError::InvalidRequest("NCBI Entrez requires an email address".to_string())
            })?;

        Ok(Self {
            client: HttpClient::new()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email,
            api_key: config.api_key.clone(),
            tool: config.tool.clone(),
        })
    }

    fn endpoint(&self, utility: &str) -> String {
        format!("{}/{}.fcgi", self.base_url, utility)
    }

    /// Parameters sent with every request
    fn identity(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("email", self.email.clone()), ("tool", self.tool.clone())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    fn parse_search(body: &str) -> Result<SearchHandle, SourceError> {
        let result: ESearchResult = serde_json::from_str(body)?;
        let data = result.esearchresult;

        if let Some(error) = data.error {
            return Err(SourceError::Parse(format!("Entrez esearch error: {}", error)));
        }

        let count = data
            .count
            .as_deref()
            .map(|c| {
                c.trim()
                    .parse::<usize>()
                    .map_err(|_| SourceError::Parse(format!("Invalid esearch count '{}'", c)))
            })
            .transpose()?
            .unwrap_or(0);

        Ok(SearchHandle {
            count,
            web_env: data.webenv.unwrap_or_default(),
            query_key: data.query_key.unwrap_or_default(),
            ids: data.idlist,
        })
    }

    /// Entrez reports some failures inside a 200 response
    fn check_xml(xml: &str) -> Result<(), SourceError> {
        if let Some(rest) = xml.split("<ERROR>").nth(1) {
            let message = rest.split("</ERROR>").next().unwrap_or("Unknown error");
            return Err(SourceError::Parse(format!("Entrez efetch error: {}", message)));
        }
        Ok(())
    }

    fn check_json(value: &serde_json::Value) -> Result<(), SourceError> {
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            return Err(SourceError::Parse(format!("Entrez error: {}", error)));
        }
        Ok(())
    }
}

#[async_trait]
impl CursorApi for NcbiClient {
    #[instrument(skip(self))]
    async fn search(
        &self,
        db: &str,
        term: &str,
        retmax: usize,
    ) -> Result<SearchHandle, SourceError> {
        let mut params = vec![
            ("db", db.to_string()),
            ("term", term.to_string()),
            ("usehistory", "y".to_string()),
            ("retmode", "json".to_string()),
            ("retmax", retmax.to_string()),
            ("idtype", "acc".to_string()),
        ];
        params.extend(self.identity());

        debug!(term, "esearch");
        let response =
            send_checked(self.client.get(&self.endpoint("esearch")).query(&params), SERVICE)
                .await?;
        let body = response.text().await?;
        let handle = Self::parse_search(&body)?;

        info!(
            count = handle.count,
            has_webenv = !handle.web_env.is_empty(),
            "esearch completed"
        );
        Ok(handle)
    }

    #[instrument(skip(self, handle))]
    async fn fetch_batch(
        &self,
        db: &str,
        handle: &SearchHandle,
        offset: usize,
        batch_size: usize,
        flavour: BatchFlavour,
    ) -> Result<RawPage, SourceError> {
        if handle.web_env.is_empty() || handle.query_key.is_empty() {
            return Err(SourceError::InvalidRequest(
                "search returned no history session".to_string(),
            ));
        }

        let mut params = vec![
            ("db", db.to_string()),
            ("WebEnv", handle.web_env.clone()),
            ("query_key", handle.query_key.clone()),
            ("retstart", offset.to_string()),
            ("retmax", batch_size.to_string()),
        ];
        params.extend(self.identity());

        match flavour {
            BatchFlavour::Full => {
                params.push(("rettype", "xml".to_string()));
                params.push(("retmode", "xml".to_string()));
                debug!("efetch records {}..{}", offset + 1, offset + batch_size);
                let response =
                    send_checked(self.client.get(&self.endpoint("efetch")).query(&params), SERVICE)
                        .await?;
                let xml = response.text().await?;
                Self::check_xml(&xml)?;
                Ok(RawPage::Xml(xml))
            }
            BatchFlavour::Summary => {
                params.push(("retmode", "json".to_string()));
                debug!("esummary records {}..{}", offset + 1, offset + batch_size);
                let response = send_checked(
                    self.client.get(&self.endpoint("esummary")).query(&params),
                    SERVICE,
                )
                .await?;
                let value: serde_json::Value = response.json().await?;
                Self::check_json(&value)?;
                Ok(RawPage::Json(value))
            }
        }
    }

    #[instrument(skip(self, ids), fields(id_count = ids.len()))]
    async fn link(&self, dbfrom: &str, db: &str, ids: &[String]) -> Result<RawPage, SourceError> {
        let mut params = vec![
            ("dbfrom", dbfrom.to_string()),
            ("db", db.to_string()),
            ("linkname", format!("{}_{}", dbfrom, db)),
            ("retmode", "json".to_string()),
        ];
        // One id parameter per identifier keeps one linkset per source record
        params.extend(ids.iter().map(|id| ("id", id.clone())));
        params.extend(self.identity());

        let response =
            send_checked(self.client.get(&self.endpoint("elink")).query(&params), SERVICE).await?;
        let value: serde_json::Value = response.json().await?;
        Self::check_json(&value)?;
        Ok(RawPage::Json(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base_url: &str) -> NcbiConfig {
        NcbiConfig {
            email: Some("me@example.org".to_string()),
            api_key: Some("secret".to_string()),
            base_url: base_url.to_string(),
            ..NcbiConfig::default()
        }
    }

    #[test]
    fn test_new_requires_email() {
        let err = NcbiClient::new(&NcbiConfig::default()).unwrap_err();
        assert!(matches!(err, SourceError::InvalidRequest(_)));
    }

    #[test]
    fn test_parse_search() {
        let body = r#"{"header":{},"esearchresult":{"count":"2","retmax":"2","retstart":"0",
            "querykey":"1","webenv":"MCID_abc","idlist":["39012345","38999999"]}}"#;
        let handle = NcbiClient::parse_search(body).unwrap();
        assert_eq!(handle.count, 2);
        assert_eq!(handle.web_env, "MCID_abc");
        assert_eq!(handle.query_key, "1");
        assert_eq!(handle.ids, vec!["39012345", "38999999"]);
    }

    #[test]
    fn test_parse_search_error() {
        let body = r#"{"esearchresult":{"ERROR":"Invalid query"}}"#;
        assert!(matches!(
            NcbiClient::parse_search(body),
            Err(SourceError::Parse(msg)) if msg.contains("Invalid query")
        ));
    }

    #[test]
    fn test_check_xml_error() {
        assert!(NcbiClient::check_xml("<eFetchResult><ERROR>Bad WebEnv</ERROR></eFetchResult>")
            .is_err());
        assert!(NcbiClient::check_xml("<PubmedArticleSet></PubmedArticleSet>").is_ok());
    }

    #[tokio::test]
    async fn test_search_sends_history_and_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pubmed".into()),
                Matcher::UrlEncoded("term".into(), "\"BRCA1 and human cancer\"".into()),
                Matcher::UrlEncoded("usehistory".into(), "y".into()),
                Matcher::UrlEncoded("email".into(), "me@example.org".into()),
                Matcher::UrlEncoded("api_key".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"esearchresult":{"count":"2","querykey":"1","webenv":"MCID_1","idlist":["1","2"]}}"#,
            )
            .create_async()
            .await;

        let client = NcbiClient::new(&config(&server.url())).unwrap();
        let handle = client
            .search("pubmed", "\"BRCA1 and human cancer\"", 100)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(handle.count, 2);
    }

    #[tokio::test]
    async fn test_fetch_batch_full_returns_xml() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("WebEnv".into(), "MCID_1".into()),
                Matcher::UrlEncoded("query_key".into(), "1".into()),
                Matcher::UrlEncoded("retstart".into(), "100".into()),
                Matcher::UrlEncoded("retmax".into(), "100".into()),
                Matcher::UrlEncoded("retmode".into(), "xml".into()),
            ]))
            .with_status(200)
            .with_body("<PubmedArticleSet></PubmedArticleSet>")
            .create_async()
            .await;

        let client = NcbiClient::new(&config(&server.url())).unwrap();
        let handle = SearchHandle {
            count: 150,
            web_env: "MCID_1".into(),
            query_key: "1".into(),
            ids: vec![],
        };
        let page = client
            .fetch_batch("pubmed", &handle, 100, 100, BatchFlavour::Full)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page, RawPage::Xml("<PubmedArticleSet></PubmedArticleSet>".into()));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body("API rate limit exceeded")
            .create_async()
            .await;

        let client = NcbiClient::new(&config(&server.url())).unwrap();
        let err = client.search("pubmed", "cancer", 100).await.unwrap_err();

        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("rate limit"));
    }

    #[tokio::test]
    async fn test_link_sends_one_id_per_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/elink.fcgi")
            .match_query(Matcher::Regex("id=11.*id=22".into()))
            .with_status(200)
            .with_body(r#"{"linksets":[]}"#)
            .create_async()
            .await;

        let client = NcbiClient::new(&config(&server.url())).unwrap();
        let page = client
            .link("pubmed", "protein", &["11".to_string(), "22".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(matches!(page, RawPage::Json(_)));
    }
}
