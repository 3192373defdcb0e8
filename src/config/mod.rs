//! Configuration management for ecospatial
//!
//! Tunables live in `config.toml`; credentials only ever come from the
//! environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub providers: ProvidersConfig,
    pub layers: LayersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: usize,
    /// Budget for each agent round-trip
    pub timeout_secs: u64,
    /// Number of previous turns sent with each request
    pub history_window: usize,
    pub response_cache_size: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 8192,
            timeout_secs: 15,
            history_window: 6,
            response_cache_size: 100,
        }
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// TTL for bulk station/district responses
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub sgis_base_url: String,
    pub airkorea_base_url: String,
    pub gg_aws_base_url: String,
    pub climate_wfs_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 600,
            request_timeout_secs: 10,
            sgis_base_url: "https://sgisapi.kostat.go.kr".to_string(),
            airkorea_base_url: "https://apis.data.go.kr/B552584".to_string(),
            gg_aws_base_url: "https://openapi.gg.go.kr".to_string(),
            climate_wfs_url: "https://climate.gg.go.kr/ols/data/api/wfs".to_string(),
        }
    }
}

impl ProvidersConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayersConfig {
    pub opacity: f32,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self { opacity: 0.75 }
    }
}

/// API keys read from the environment
#[derive(Clone, Default)]
pub struct Credentials {
    pub gemini_api_key: Option<String>,
    pub sgis_consumer_key: Option<String>,
    pub sgis_consumer_secret: Option<String>,
    pub airkorea_service_key: Option<String>,
    pub gg_aws_api_key: Option<String>,
    pub gg_climate_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: env_key("GEMINI_API_KEY"),
            sgis_consumer_key: env_key("SGIS_CONSUMER_KEY"),
            sgis_consumer_secret: env_key("SGIS_CONSUMER_SECRET"),
            airkorea_service_key: env_key("AIRKOREA_SERVICE_KEY"),
            gg_aws_api_key: env_key("GG_AWS_API_KEY"),
            gg_climate_api_key: env_key("GG_CLIMATE_API_KEY"),
        }
    }
}

// Keys are never printed, only whether they are present
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "set" } else { "unset" };
        f.debug_struct("Credentials")
            .field("gemini_api_key", &set(&self.gemini_api_key))
            .field("sgis_consumer_key", &set(&self.sgis_consumer_key))
            .field("sgis_consumer_secret", &set(&self.sgis_consumer_secret))
            .field("airkorea_service_key", &set(&self.airkorea_service_key))
            .field("gg_aws_api_key", &set(&self.gg_aws_api_key))
            .field("gg_climate_api_key", &set(&self.gg_climate_api_key))
            .finish()
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "ecospatial") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.timeout_secs, 15);
        assert_eq!(config.agent.history_window, 6);
        assert_eq!(config.providers.cache_ttl(), Duration::from_secs(600));
        assert!((config.layers.opacity - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\ntimeout_secs = 30\n\n[layers]\nopacity = 0.5").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.agent.timeout_secs, 30);
        assert_eq!(config.agent.history_window, 6);
        assert!((config.layers.opacity - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.providers.cache_ttl_secs, 600);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.agent.model, AgentConfig::default().model);
    }

    #[test]
    fn test_invalid_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent\ntimeout_secs = ").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_credentials_debug_hides_values() {
        let creds = Credentials {
            gemini_api_key: Some("secret-value".into()),
            ..Default::default()
        };
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("secret-value"));
        assert!(shown.contains("set"));
    }
}
