//! Configuration types for the content engine.
//!
//! Follows a builder pattern for complex configuration with validation.
//! Configuration files are YAML.

use crate::error::{Error, Result};
use crate::vitals::PerfBudget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where posts come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Posts read and parsed once from the content directory
    #[default]
    Local,
    /// Posts fetched from a remote content host, local content as fallback
    Remote,
}

/// Remote content host settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    /// Directory listing endpoint; `{api_base}/{category}` lists one category
    pub api_base: String,
    /// Raw content base used when a listing entry has no download URL
    #[serde(default)]
    pub raw_base: Option<String>,
    /// Optional manifest document naming the categories
    #[serde(default)]
    pub manifest_url: Option<String>,
    /// Categories to list when no manifest is configured or it fails
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Session cache settings (remote mode only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Expiry of the cached aggregate listing
    pub ttl_secs: u64,
    /// Fixed key of the aggregate entry
    pub key: String,
    /// Directory for the file-backed store; in-memory when absent
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            key: "inkpress:posts".to_string(),
            dir: None,
        }
    }
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Maximum fuzzy score (0.0 = exact, 1.0 = anything) counted as a match
    pub threshold: f64,
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            default_limit: 20,
        }
    }
}

/// Developer performance overlay settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerfConfig {
    /// Query parameter that toggles the overlay
    pub query_param: String,
    /// Persisted flag key
    pub storage_key: String,
    pub budget: PerfBudget,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            query_param: "perf".to_string(),
            storage_key: "inkpress.perf-overlay".to_string(),
            budget: PerfBudget::default(),
        }
    }
}

/// Global site configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    /// Configuration profile name
    pub profile: String,
    /// Local content root: `<content_dir>/<category>/<slug>.md`
    pub content_dir: PathBuf,
    pub source: SourceMode,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub perf: PerfConfig,
    pub log_level: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            content_dir: PathBuf::from("content"),
            source: SourceMode::Local,
            remote: None,
            cache: CacheConfig::default(),
            search: SearchConfig::default(),
            perf: PerfConfig::default(),
            log_level: "INFO".to_string(),
        }
    }
}

impl SiteConfig {
    /// Create new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder rooted at a content directory
    pub fn builder(content_dir: impl Into<PathBuf>) -> SiteConfigBuilder {
        SiteConfigBuilder::new(content_dir)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.search.threshold) {
            return Err(Error::config_error(format!(
                "Search threshold must be within 0.0..=1.0, got {}",
                self.search.threshold
            )));
        }

        if self.cache.enabled && self.cache.key.is_empty() {
            return Err(Error::config_error("Cache key cannot be empty"));
        }

        match self.source {
            SourceMode::Local => {
                if !self.content_dir.is_dir() {
                    return Err(Error::config_error(format!(
                        "Content directory does not exist: {}",
                        self.content_dir.display()
                    )));
                }
            }
            SourceMode::Remote => {
                let remote = self.remote.as_ref().ok_or_else(|| {
                    Error::config_error("Remote source selected but no remote settings given")
                })?;
                if remote.api_base.is_empty() {
                    return Err(Error::config_error("Remote api_base cannot be empty"));
                }
                if remote.categories.is_empty() && remote.manifest_url.is_none() {
                    return Err(Error::config_error(
                        "Remote source needs categories or a manifest_url",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Load configuration from a YAML file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config_error(format!(
                "Failed to load config from {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::config_error(format!("Invalid configuration: {}", e)))
    }

    /// Save configuration to a YAML file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| Error::config_error(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, yaml).await.map_err(|e| {
            Error::config_error(format!(
                "Failed to save config to {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Remote categories known from static configuration, normalized
    pub fn remote_categories(&self) -> Vec<String> {
        self.remote
            .as_ref()
            .map(|r| {
                r.categories
                    .iter()
                    .map(|c| crate::utils::normalize_category(c))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Builder for SiteConfig
pub struct SiteConfigBuilder {
    config: SiteConfig,
}

impl SiteConfigBuilder {
    /// Create a new builder
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: SiteConfig {
                content_dir: content_dir.into(),
                ..SiteConfig::default()
            },
        }
    }

    /// Switch to remote mode
    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.config.source = SourceMode::Remote;
        self.config.remote = Some(remote);
        self
    }

    /// Set cache expiry
    pub fn cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.config.cache.ttl_secs = ttl_secs;
        self
    }

    /// Use a file-backed session store in this directory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache.dir = Some(dir.into());
        self
    }

    /// Set the fuzzy search threshold
    pub fn search_threshold(mut self, threshold: f64) -> Self {
        self.config.search.threshold = threshold;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<SiteConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
