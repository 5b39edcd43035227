//! Configuration settings structures for mailrelay
//!
//! Everything here can be loaded from TOML files and `MAILRELAY_*`
//! environment variables, see [`ConfigLoader`](super::ConfigLoader).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "mailrelay".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/mailrelay.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============================================================================
// Auth Configuration
// ============================================================================

/// User record attached to a client, copied into issued tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
}

/// One entry of the client credential directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    pub client_id: String,

    /// Plain shared secret; only its argon2 hash is kept after startup
    pub secret: String,

    #[serde(default)]
    pub user: Option<UserSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuthSettings {
    /// HMAC key for bearer tokens. Set it through `MAILRELAY_AUTH__SIGNING_KEY`
    /// outside of development.
    #[serde(default)]
    pub signing_key: String,

    #[serde(default)]
    pub clients: Vec<ClientSettings>,
}

// ============================================================================
// Mailer Configuration
// ============================================================================

/// Delivery backend implementation selected by a provider descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Amazon SES v2 `SendEmail`
    Ses,
    Sendgrid,
    Webhook,
    /// In-memory provider, refused in production
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ses => "ses",
            ProviderKind::Sendgrid => "sendgrid",
            ProviderKind::Webhook => "webhook",
            ProviderKind::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for sendgrid and ses, target URL for webhook
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,

    /// AWS region, required for ses
    #[serde(default)]
    pub region: Option<String>,

    /// Static AWS keys. When both are absent ses uses the default AWS
    /// credential chain.
    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default)]
    pub configuration_set: Option<String>,
}

impl Default for ProviderCredentials {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            timeout_seconds: default_provider_timeout(),
            region: None,
            access_key_id: None,
            secret_access_key: None,
            configuration_set: None,
        }
    }
}

/// Fallback sender used when the caller's token carries no identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderSettings {
    pub name: String,
    pub email: String,
}

/// One provider descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ProviderKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower is tried first, must be unique among enabled providers
    pub priority: u32,

    #[serde(default)]
    pub credentials: ProviderCredentials,

    pub sender: SenderSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailerSettings {
    #[serde(default = "default_charset")]
    pub charset: String,

    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
}

impl Default for MailerSettings {
    fn default() -> Self {
        Self {
            charset: default_charset(),
            providers: Vec::new(),
        }
    }
}

impl MailerSettings {
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderSettings> {
        self.providers.iter().filter(|p| p.enabled)
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert the file representation into the runtime [`LoggerConfig`].
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = self.file.into_file_config()?;

        LoggerConfig::new(console, file, self.level)
            .map_err(|e| ConfigError::validation("logger", e.to_string()))
    }
}

impl FileSettings {
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format)
            .map_err(|e| ConfigError::validation("logger.file", e.to_string()))
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub mailer: MailerSettings,
}
