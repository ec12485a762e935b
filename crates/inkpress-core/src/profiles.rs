//! Pre-configured profiles for different deployment scenarios
//!
//! - Development: verbose logging, short cache expiry, loose search
//! - Production: quiet logging, long cache expiry
//! - Offline: local content only, no session cache

use crate::config::{SiteConfig, SourceMode};

/// Profile selector for pre-configured deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigProfile {
    /// Development: Verbose logging, cache refreshes every minute
    Development,
    /// Production: Info logging, cache kept for half an hour
    Production,
    /// Offline: Local content only
    Offline,
}

impl ConfigProfile {
    /// Create a SiteConfig from this profile
    pub fn create_config(self) -> SiteConfig {
        let mut config = SiteConfig::new();

        match self {
            Self::Development => {
                config.log_level = "DEBUG".to_string();
                config.cache.ttl_secs = 60;
                config.search.threshold = 0.45;
            }

            Self::Production => {
                config.log_level = "INFO".to_string();
                config.cache.ttl_secs = 30 * 60;
                config.search.threshold = 0.4;
            }

            Self::Offline => {
                config.log_level = "WARN".to_string();
                config.source = SourceMode::Local;
                config.remote = None;
                config.cache.enabled = false;
            }
        }

        config.profile = self.name().to_string();
        config
    }

    /// Profile name as used in config files and on the command line
    pub fn name(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Offline => "offline",
        }
    }
}

impl std::str::FromStr for ConfigProfile {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "offline" => Ok(Self::Offline),
            other => Err(crate::Error::config_error(format!(
                "Unknown profile '{}'",
                other
            ))),
        }
    }
}
