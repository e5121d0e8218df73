//! Galaxy workflow platform REST client.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::GalaxyConfig;
use crate::models::EntityKind;
use crate::sources::{EntityApi, SourceError};
use crate::utils::{send_checked, HttpClient};

const SERVICE: &str = "Galaxy";

#[derive(Debug, Clone)]
pub struct GalaxyClient {
    client: HttpClient,
    base_url: Url,
    api_key: String,
}

impl GalaxyClient {
    pub fn new(config: &GalaxyConfig) -> Result<Self, SourceError> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| SourceError::InvalidRequest("Galaxy URL is not set".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SourceError::InvalidRequest("Galaxy API key is not set".to_string()))?;

        // Url::join drops the last path segment unless it ends with '/'
        let normalized = format!("{}/", raw.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| SourceError::InvalidRequest(format!("Invalid Galaxy URL: {}", e)))?;

        Ok(Self {
            client: HttpClient::new()?,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|e| {
                SourceError::InvalidRequest(format!("Invalid Galaxy path {}: {}", path, e))
            })
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, SourceError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let request = self
            .client
            .get(url.as_str())
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .query(query);
        let response = send_checked(request, SERVICE).await?;
        Ok(response.json().await?)
    }

    fn listing_path(kind: EntityKind) -> (&'static str, &'static [(&'static str, &'static str)]) {
        match kind {
            EntityKind::Library => ("api/libraries", &[]),
            EntityKind::History => ("api/histories", &[]),
            EntityKind::Workflow => ("api/workflows", &[]),
            // Without in_panel=false tools come back grouped into panel sections
            EntityKind::Tool => ("api/tools", &[("in_panel", "false")]),
        }
    }
}

#[async_trait]
impl EntityApi for GalaxyClient {
    #[instrument(skip(self))]
    async fn list(&self, kind: EntityKind) -> Result<Vec<Value>, SourceError> {
        let (path, query) = Self::listing_path(kind);
        match self.get_json(path, query).await? {
            Value::Array(items) => Ok(items),
            other => Err(SourceError::Parse(format!(
                "expected a JSON array of {}, got {}",
                kind.plural(),
                json_kind(&other)
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn show_history(&self, id: &str) -> Result<Value, SourceError> {
        let path = format!("api/histories/{}", id);
        self.get_json(&path, &[]).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
