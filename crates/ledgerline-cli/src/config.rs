//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ledgerline_core::{DEFAULT_BATCH_SIZE, HttpConfig};
use serde::Deserialize;

/// Global configuration for ledgerline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub subscan: SubscanConfig,
    pub bigquery: BigQuerySection,
    pub output: OutputConfig,
    pub ingest: IngestConfig,
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubscanConfig {
    /// Subdomain of `api.subscan.io`
    pub network: String,
    /// Full transfers URL, overrides `network`
    pub endpoint: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
}

impl Default for SubscanConfig {
    fn default() -> Self {
        Self {
            network: ledgerline_subscan::DEFAULT_NETWORK.to_string(),
            endpoint: None,
            api_key: std::env::var("SUBSCAN_API_KEY").ok(),
        }
    }
}

impl SubscanConfig {
    pub fn transfers_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| ledgerline_subscan::transfers_endpoint(&self.network))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BigQuerySection {
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub table: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub access_token: Option<String>,
    pub endpoint: Option<String>,
}

impl Default for BigQuerySection {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset: None,
            table: "transfers".to_string(),
            access_token: std::env::var("BIGQUERY_ACCESS_TOKEN").ok(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
    pub compression_level: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("./data"),
            compression_level: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Records per page request (Subscan caps `row` at 100)
    pub page_size: u32,
    /// Records per sink flush
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        let d = HttpConfig::default();
        Self {
            timeout_secs: d.timeout.as_secs(),
            connect_timeout_secs: d.connect_timeout.as_secs(),
            max_retries: d.max_retries,
            retry_base_ms: d.retry_base.as_millis() as u64,
        }
    }
}

impl HttpSection {
    pub fn to_http_config(self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_retries: self.max_retries,
            retry_base: Duration::from_millis(self.retry_base_ms),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./ledgerline.toml (current directory)
    /// 2. ~/.config/ledgerline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("ledgerline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "ledgerline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
