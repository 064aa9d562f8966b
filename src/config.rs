use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Environment variable naming an optional override file
pub const CONFIG_PATH_ENV: &str = "INCIDENT_TRACKER_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Lifecycle rules
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Listing and pagination
    #[serde(default)]
    pub listing: ListingConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and the environment
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/incident-tracker.toml".to_string());

        Self::load_from(&config_path)
    }

    /// Same layering as [`Config::load`] with an explicit override file
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: INCIDENT_TRACKER_)
            .add_source(
                config::Environment::with_prefix("INCIDENT_TRACKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// How far in the future a submission timestamp may lie (seconds)
    #[serde(default)]
    pub max_future_skew_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Page size used when the caller gives none
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound on any requested page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl ListingConfig {
    /// Resolve a requested page size against the configured bounds
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.json_logs);
        assert_eq!(config.lifecycle.max_future_skew_secs, 0);
        assert_eq!(config.listing.default_page_size, 20);
        assert_eq!(config.listing.max_page_size, 100);
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.listing.max_page_size, 100);
    }

    #[test]
    fn test_override_file_is_layered_over_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("override.toml");
        std::fs::write(&path, "[listing]\ndefault_page_size = 50\n").unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.listing.default_page_size, 50);
        assert_eq!(config.listing.max_page_size, 100);
    }

    #[test]
    fn test_malformed_file_is_a_configuration_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[listing\nmax_page_size = ").unwrap();

        let err = Config::load_from(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_page_size_clamping() {
        let listing = ListingConfig::default();
        assert_eq!(listing.page_size(None), 20);
        assert_eq!(listing.page_size(Some(500)), 100);
        assert_eq!(listing.page_size(Some(0)), 1);
        assert_eq!(listing.page_size(Some(42)), 42);
    }
}
