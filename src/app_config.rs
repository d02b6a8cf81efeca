use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::language_utils::TargetLanguage;

/// Application configuration module
/// This module handles loading and validating the JSON configuration file and
/// merging command-line and environment overrides on top of it.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    // @field: Target language (English name, native name, or ISO code)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    // @field: Model endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,

    // @field: Request tuning shared by every capability call
    #[serde(default)]
    pub common: CommonConfig,

    // @field: Image resolution limits
    #[serde(default)]
    pub images: ImageConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// OpenAI-compatible endpoint configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Base URL, `/chat/completions` is appended
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            rate_limit: None,
        }
    }
}

/// Settings applicable to every capability call
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommonConfig {
    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Number of cells processed at the same time
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// Image resolution limits
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageConfig {
    // @field: Largest accepted payload in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_bytes: u64,

    // @field: Network fetch timeout seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_image_bytes(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching `log` filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Values that take precedence over the file, gathered from CLI flags and the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target_language: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub concurrency: Option<usize>,
    pub log_level: Option<LogLevel>,
}

fn default_target_language() -> String {
    "Chinese".to_string()
}

fn default_endpoint() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "google/gemini-2.5-flash-preview-05-20".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_concurrent_requests() -> usize {
    1
}

fn default_max_image_bytes() -> u64 {
    20 * 1024 * 1024
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration.
    ///
    /// An existing file at `path` wins; otherwise the per-user file under the
    /// platform config directory is tried; otherwise defaults are used. A missing
    /// file is never created.
    pub fn load(path: &Path) -> Result<Self> {
        let candidates = std::iter::once(path.to_path_buf()).chain(Self::user_config_path());

        for candidate in candidates {
            if candidate.is_file() {
                debug!("Loading configuration from {:?}", candidate);
                return Self::from_file(&candidate);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// `<config dir>/nbglot/conf.json`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nbglot").join("conf.json"))
    }

    /// Apply CLI and environment overrides
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(language) = overrides.target_language {
            self.target_language = language;
        }
        if let Some(api_key) = overrides.api_key {
            self.provider.api_key = api_key;
        }
        if let Some(model) = overrides.model {
            self.provider.model = model;
        }
        if let Some(endpoint) = overrides.endpoint {
            self.provider.endpoint = endpoint;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.common.concurrent_requests = concurrency;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
    }

    /// Resolved target language
    pub fn language(&self) -> Result<TargetLanguage, AppError> {
        Ok(self.target_language.parse::<TargetLanguage>()?)
    }

    /// Validate the configuration for consistency and required values.
    ///
    /// Every missing credential is reported at once so a single run fixes them all.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();
        if self.provider.api_key.trim().is_empty() {
            missing.push("API key (API_KEY)");
        }
        if self.provider.model.trim().is_empty() {
            missing.push("model name (MODEL_NAME)");
        }
        if self.provider.endpoint.trim().is_empty() {
            missing.push("endpoint (MODEL_BASE_URL)");
        }
        if !missing.is_empty() {
            return Err(AppError::Configuration(format!("missing {}", missing.join(", "))));
        }

        if url::Url::parse(&self.provider.endpoint).is_err() {
            return Err(AppError::Configuration(format!(
                "endpoint is not a valid URL: {}",
                self.provider.endpoint
            )));
        }
        if !(0.0..=2.0).contains(&self.common.temperature) {
            return Err(AppError::Configuration(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.common.temperature
            )));
        }
        if self.common.concurrent_requests == 0 {
            return Err(AppError::Configuration("concurrent_requests must be at least 1".to_string()));
        }

        self.language()?;
        Ok(())
    }

    /// API key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let key = self.provider.api_key.trim();
        let count = key.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = key.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            provider: ProviderConfig::default(),
            common: CommonConfig::default(),
            images: ImageConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
