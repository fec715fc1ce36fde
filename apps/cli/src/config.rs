// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use ccapi_core::cache::CachePolicy;
use ccapi_nodes::fallback::HandlerPolicy;
use ccapi_nodes::transport::PollPolicy;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Log level for filtering messages.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Log file format options.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging configuration for console and file output.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct LogConfig {
    #[serde(default)]
    pub console_enable: bool,
    #[serde(default)]
    pub file_enable: bool,
    #[serde(default)]
    pub console_level: LogLevel,
    #[serde(default)]
    pub file_level: LogLevel,
    #[serde(default)]
    pub file_path: String,
    /// Format for file logging: "text" (default) or "json"
    #[serde(default)]
    pub file_format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enable: true,
            file_enable: false,
            console_level: LogLevel::default(),
            file_level: LogLevel::Debug,
            file_path: "./ccapi.log".to_string(),
            file_format: LogFormat::default(),
        }
    }
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_max_attempts() -> u32 {
    120
}

/// Polling budget for async tasks. The effective timeout is `interval_secs * max_attempts`.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: default_poll_interval_secs(), max_attempts: default_max_attempts() }
    }
}

impl PollConfig {
    pub const fn policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(self.interval_secs), self.max_attempts)
    }
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

/// HTTP client timeouts.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct HttpConfig {
    /// Whole-request timeout (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// TCP/TLS connect timeout (default: 5)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_ppio_base_url() -> String {
    ccapi_nodes::providers::ppio::DEFAULT_BASE_URL.to_string()
}

/// PPIO endpoint configuration.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct PpioConfig {
    #[serde(default = "default_ppio_base_url")]
    pub base_url: String,
}

impl Default for PpioConfig {
    fn default() -> Self {
        Self { base_url: default_ppio_base_url() }
    }
}

const fn default_cache_max_entries() -> usize {
    50
}

const fn default_cache_max_age_secs() -> u64 {
    3600
}

/// Limits of the in-process request cache for synchronous image generation.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_cache_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
            max_age_secs: default_cache_max_age_secs(),
        }
    }
}

impl CacheConfig {
    pub const fn policy(&self) -> CachePolicy {
        CachePolicy {
            max_entries: self.max_entries,
            max_age: Duration::from_secs(self.max_age_secs),
        }
    }
}

/// Where API keys are read from when not passed on the command line or in the environment.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct CredentialsConfig {
    /// TOML file with one section per provider, e.g. `[ppio] api_key = "..."`
    pub file: Option<PathBuf>,
}

/// Root configuration for the ccapi CLI.
#[derive(Deserialize, Serialize, Default, Debug, Clone, JsonSchema)]
pub struct Config {
    /// What `image` and `speech` do when a provider call fails.
    #[serde(default)]
    pub on_error: HandlerPolicy,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub ppio: PpioConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub file_missing: Option<String>,
}

/// Loads the configuration from defaults, a TOML file, and `CCAPI_` environment variables.
///
/// Nested keys use `__` in variable names, e.g. `CCAPI_POLL__MAX_ATTEMPTS=60`.
///
/// # Errors
///
/// Returns an error if the configuration file contains invalid TOML or a value has the wrong
/// type.
pub fn load(config_path: &str) -> Result<ConfigLoadResult, Box<figment::Error>> {
    let mut figment =
        Figment::new().merge(figment::providers::Serialized::defaults(Config::default()));

    let mut file_missing = None;

    if std::path::Path::new(config_path).exists() {
        figment = figment.merge(Toml::file(config_path));
    } else {
        file_missing = Some(config_path.to_string());
    }

    let config: Config =
        figment.merge(Env::prefixed("CCAPI_").split("__")).extract().map_err(Box::new)?;

    Ok(ConfigLoadResult { config, file_missing })
}

/// Generates the default configuration as a pretty-printed TOML string.
///
/// # Errors
///
/// Returns an error if the default configuration cannot be serialized to TOML.
pub fn generate_default() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&Config::default())
}
