//! Pipeline configuration
//!
//! Configuration is layered with the following precedence (lowest first):
//!
//! 1. Hardcoded defaults
//! 2. A TOML config file (explicit path, or `config.toml` in the platform config dir)
//! 3. Environment variables (`GEMINI_API_KEY`, `POSTCRAFT_MODEL`, `POSTCRAFT_BASE_URL`)
//!
//! ```toml
//! workers = 4
//!
//! [backend]
//! model = "gemini-2.5-flash"
//!
//! [cache]
//! max_entries = 100
//! ttl = "10m"
//!
//! [retry]
//! attempts = 3
//! initial_delay = "2s"
//! max_delay = "10s"
//! ```

use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Get the platform directory holding `config.toml`
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "postcraft", "postcraft").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the platform directory holding history and feedback files
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "postcraft", "postcraft").map(|dirs| dirs.data_dir().to_path_buf())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Size of the blocking worker pool shared by all sessions.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Never written back out; read from the file or `GEMINI_API_KEY`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Spread waits by up to +/- half of `jitter_factor` of the delay
    #[serde(default)]
    pub jitter: bool,

    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

/// Knobs that shape the generated content rather than the plumbing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_audience")]
    pub audience: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_entries() -> usize {
    100
}

fn default_ttl() -> Duration {
    Duration::from_secs(600)
}

fn default_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_jitter_factor() -> f64 {
    0.5
}

fn default_workers() -> usize {
    4
}

fn default_audience() -> String {
    "young adults aged 18-30".to_string()
}

fn default_language() -> String {
    "Brazilian Portuguese".to_string()
}

fn default_platform() -> String {
    "Instagram".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl: default_ttl(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            jitter: false,
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            audience: default_audience(),
            language: default_language(),
            platform: default_platform(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            cache: CacheConfig::default(),
            retry: RetrySettings::default(),
            workers: default_workers(),
            content: ContentConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// With no explicit path the platform config file is used when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => config_dir()
                .map(|dir| dir.join("config.toml"))
                .filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(file) => Self::from_file(&file)?,
            None => Self::default(),
        };
        config.merge_env_vars();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn merge_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            if !api_key.trim().is_empty() {
                self.backend.api_key = Some(api_key);
            }
        }

        if let Ok(model) = std::env::var("POSTCRAFT_MODEL") {
            self.backend.model = model;
        }

        if let Ok(base_url) = std::env::var("POSTCRAFT_BASE_URL") {
            self.backend.base_url = base_url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(Error::Config("cache.max_entries must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        if self.retry.attempts == 0 {
            return Err(Error::Config("retry.attempts must be at least 1".into()));
        }
        if self.retry.max_delay < self.retry.initial_delay {
            return Err(Error::Config(
                "retry.max_delay must not be shorter than retry.initial_delay".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(Error::Config(
                "retry.jitter_factor must be between 0.0 and 1.0".into(),
            ));
        }
        if self.backend.model.trim().is_empty() {
            return Err(Error::Config("backend.model must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_pipeline_contract() {
        let config = PipelineConfig::default();
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.ttl, Duration::from_secs(600));
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
        assert_eq!(config.retry.max_delay, Duration::from_secs(10));
        assert!(!config.retry.jitter);
        assert_eq!(config.workers, 4);
        assert_eq!(config.backend.model, DEFAULT_MODEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            workers = 2

            [cache]
            ttl = "30s"

            [retry]
            max_delay = "5s"
            "#,
        )
        .unwrap();

        assert_eq!(config.workers, 2);
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.retry.max_delay, Duration::from_secs(5));
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
        assert_eq!(config.content.platform, "Instagram");
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\nmodel = \"gemini-custom\"").unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.backend.model, "gemini-custom");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = PipelineConfig::from_file(Path::new("/nonexistent/postcraft.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.retry.max_delay = Duration::from_secs(1);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.retry.jitter_factor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = PipelineConfig::default();
        config.backend.api_key = Some("secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
    }
}
