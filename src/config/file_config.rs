//! Configuration file support for review-agent.
//!
//! # Configuration File Format
//!
//! ```toml
//! [llm]
//! api_key = "your-gemini-key"
//! model = "gemini-1.5-flash-latest"
//!
//! [ncbi]
//! email = "you@example.org"
//! api_key = "optional-entrez-key"
//! default_database = "pubmed"
//!
//! [wos]
//! api_key = "your-clarivate-key"
//! database = "WOS"
//! sort_field = "LD"
//! ascending = true
//!
//! [galaxy]
//! url = "https://usegalaxy.org"
//! api_key = "your-galaxy-key"
//!
//! [fetch]
//! batch_size = 100
//! max_records = 1000
//! batch_delay_ms = 400
//! page_size = 50
//! max_pages = 5
//! page_delay_ms = 500
//!
//! [output]
//! summary_preview = 5
//! full_preview = 3
//! abstract_width = 200
//! ```

use std::path::{Path, PathBuf};

use super::{ConfigError, Settings};

/// Name looked up in the working directory
const LOCAL_CONFIG_NAME: &str = "review-agent.toml";

/// Configuration file wrapper
#[derive(Debug, Default)]
pub struct ConfigFile {
    pub settings: Settings,
}

impl ConfigFile {
    /// Load configuration from a TOML file, without environment overlays
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        let settings = toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))?;
        Ok(Self { settings })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content = toml::to_string_pretty(&self.settings)
            .map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Find a configuration file in the default locations
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("review-agent").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load settings from every layer: `.env`, file, prefixed env, flat env
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    // A missing .env is the normal case
    let _ = dotenvy::dotenv();

    let mut builder = config::Config::builder();
    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(found) = find_config_file() {
                tracing::info!("Using config file: {}", found.display());
                builder = builder.add_source(config::File::from(found.as_path()));
            }
        }
    }
    builder = builder.add_source(
        config::Environment::with_prefix("REVIEW_AGENT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let mut settings: Settings = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigFileError::Parse(e.to_string()))?;

    settings.apply_env(|key| std::env::var(key).ok())?;
    Ok(settings)
}
