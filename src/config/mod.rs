//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `REVIEW_AGENT__SECTION__KEY` environment variables, then the flat variables
//! the agents have always read (`GOOGLE_API_KEY`, `NCBI_EMAIL`, ...). A `.env`
//! file in the working directory is loaded before any of that.

mod file_config;

pub use file_config::{find_config_file, load_settings, ConfigFile, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Language model used for intent resolution
    #[serde(default)]
    pub llm: LlmConfig,

    /// NCBI Entrez client
    #[serde(default)]
    pub ncbi: NcbiConfig,

    /// Web of Science Starter API client
    #[serde(default)]
    pub wos: WosConfig,

    /// Galaxy server client
    #[serde(default)]
    pub galaxy: GalaxyConfig,

    /// Batch sizes, caps and rate-limit delays
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Preview settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Language model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// NCBI Entrez settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcbiConfig {
    /// Contact email; Entrez requires one on every request
    #[serde(default)]
    pub email: Option<String>,

    /// Optional key for higher Entrez rate limits
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_ncbi_base_url")]
    pub base_url: String,

    /// Value of the `tool` parameter
    #[serde(default = "default_tool_name")]
    pub tool: String,

    /// Database used when a command does not name one
    #[serde(default = "default_ncbi_database")]
    pub default_database: String,
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            email: None,
            api_key: None,
            base_url: default_ncbi_base_url(),
            tool: default_tool_name(),
            default_database: default_ncbi_database(),
        }
    }
}

fn default_ncbi_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

fn default_tool_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_ncbi_database() -> String {
    "pubmed".to_string()
}

/// Web of Science Starter API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WosConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_wos_base_url")]
    pub base_url: String,

    /// Collection code sent as `db`
    #[serde(default = "default_wos_database")]
    pub database: String,

    /// Sort field code (e.g. "LD" load date, "PY" publication year)
    #[serde(default = "default_sort_field")]
    pub sort_field: String,

    #[serde(default = "default_true")]
    pub ascending: bool,
}

impl Default for WosConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_wos_base_url(),
            database: default_wos_database(),
            sort_field: default_sort_field(),
            ascending: true,
        }
    }
}

impl WosConfig {
    /// Sort parameter as the API expects it, e.g. "LD A"
    pub fn sort(&self) -> String {
        let direction = if self.ascending { "A" } else { "D" };
        format!("{} {}", self.sort_field, direction)
    }
}

fn default_wos_base_url() -> String {
    "https://api.clarivate.com/apis/wos-starter/v1/documents".to_string()
}

fn default_wos_database() -> String {
    "WOS".to_string()
}

fn default_sort_field() -> String {
    "LD".to_string()
}

fn default_true() -> bool {
    true
}

/// Galaxy server settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalaxyConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

/// Retrieval limits and the delays that keep us inside upstream usage policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Records per Entrez batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum records fetched per Entrez search
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Pause between Entrez batches. Entrez allows 3 requests/s without a key.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Hits per Web of Science page (50 is the Starter API maximum)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum Web of Science pages per search
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Pause between Web of Science requests
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_records: default_max_records(),
            batch_delay_ms: default_batch_delay_ms(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl FetchConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_max_records() -> usize {
    1000
}

fn default_batch_delay_ms() -> u64 {
    400
}

fn default_page_size() -> usize {
    50
}

fn default_max_pages() -> usize {
    5
}

fn default_page_delay_ms() -> u64 {
    500
}

/// Preview rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Records shown for summaries, links and entity listings
    #[serde(default = "default_summary_preview")]
    pub summary_preview: usize,

    /// Records shown for full-record fetches
    #[serde(default = "default_full_preview")]
    pub full_preview: usize,

    /// Display width abstracts are cut to in previews
    #[serde(default = "default_abstract_width")]
    pub abstract_width: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            summary_preview: default_summary_preview(),
            full_preview: default_full_preview(),
            abstract_width: default_abstract_width(),
        }
    }
}

fn default_summary_preview() -> usize {
    5
}

fn default_full_preview() -> usize {
    3
}

fn default_abstract_width() -> usize {
    200
}

/// Which agent the settings must support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentProfile {
    /// NCBI + Web of Science literature review agent
    Review,
    /// Galaxy project browser
    Galaxy,
}

/// Configuration errors; fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid configuration value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error(transparent)]
    File(#[from] ConfigFileError),
}

impl Settings {
    /// Overlay the flat environment variables the agents read.
    ///
    /// `lookup` is usually `std::env::var(..).ok()`; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GOOGLE_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("NCBI_EMAIL") {
            self.ncbi.email = Some(v);
        }
        if let Some(v) = get("NCBI_API_KEY") {
            self.ncbi.api_key = Some(v);
        }
        if let Some(v) = get("DATABASE") {
            self.ncbi.default_database = v;
        }
        if let Some(v) = get("WOS_API_KEY") {
            self.wos.api_key = Some(v);
        }
        if let Some(v) = get("WOS_BASE_URL") {
            self.wos.base_url = v;
        }
        if let Some(v) = get("DATABASE_CODE") {
            self.wos.database = v;
        }
        if let Some(v) = get("SORT_FIELD") {
            self.wos.sort_field = v;
        }
        if let Some(v) = get("ASCENDING") {
            self.wos.ascending = match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(ConfigError::Invalid {
                        key: "ASCENDING",
                        message: format!("expected true or false, got '{}'", other),
                    })
                }
            };
        }
        if let Some(v) = get("GALAXY_URL") {
            self.galaxy.url = Some(v);
        }
        if let Some(v) = get("GALAXY_API_KEY") {
            self.galaxy.api_key = Some(v);
        }
        Ok(())
    }

    /// Check that everything the chosen agent needs is present
    pub fn validate(&self, profile: AgentProfile) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.llm.api_key.is_none() {
            missing.push("GOOGLE_API_KEY");
        }
        match profile {
            AgentProfile::Review => {
                if self.ncbi.email.is_none() {
                    missing.push("NCBI_EMAIL");
                }
                if self.wos.api_key.is_none() {
                    missing.push("WOS_API_KEY");
                }
            }
            AgentProfile::Galaxy => {
                if self.galaxy.url.is_none() {
                    missing.push("GALAXY_URL");
                }
                if self.galaxy.api_key.is_none() {
                    missing.push("GALAXY_API_KEY");
                }
            }
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        if self.fetch.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch.batch_size",
                message: "must be at least 1".to_string(),
            });
        }
        if self.fetch.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch.page_size",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.ncbi.default_database, "pubmed");
        assert_eq!(settings.wos.database, "WOS");
        assert_eq!(settings.wos.sort(), "LD A");
        assert_eq!(settings.fetch.batch_size, 100);
        assert_eq!(settings.fetch.max_records, 1000);
        assert_eq!(settings.fetch.max_pages, 5);
        assert_eq!(settings.output.full_preview, 3);
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("GOOGLE_API_KEY", "g-key"),
                ("NCBI_EMAIL", "me@example.org"),
                ("DATABASE", "protein"),
                ("SORT_FIELD", "PY"),
                ("ASCENDING", "false"),
            ]))
            .unwrap();

        assert_eq!(settings.llm.api_key.as_deref(), Some("g-key"));
        assert_eq!(settings.ncbi.email.as_deref(), Some("me@example.org"));
        assert_eq!(settings.ncbi.default_database, "protein");
        assert_eq!(settings.wos.sort(), "PY D");
    }

    #[test]
    fn test_apply_env_ignores_blank_values() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("NCBI_EMAIL", "  ")])).unwrap();
        assert!(settings.ncbi.email.is_none());
    }

    #[test]
    fn test_apply_env_rejects_bad_boolean() {
        let mut settings = Settings::default();
        let err = settings.apply_env(env(&[("ASCENDING", "sideways")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ASCENDING", .. }));
    }

    #[test]
    fn test_validate_review_reports_every_missing_key() {
        let settings = Settings::default();
        match settings.validate(AgentProfile::Review) {
            Err(ConfigError::Missing(keys)) => {
                assert_eq!(keys, vec!["GOOGLE_API_KEY", "NCBI_EMAIL", "WOS_API_KEY"]);
            }
            other => panic!("Expected missing keys, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_galaxy() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("GOOGLE_API_KEY", "g"),
                ("GALAXY_URL", "https://usegalaxy.org"),
                ("GALAXY_API_KEY", "k"),
            ]))
            .unwrap();
        assert!(settings.validate(AgentProfile::Galaxy).is_ok());
        assert!(settings.validate(AgentProfile::Review).is_err());
    }
}
