//! Configuration validation logic
//!
//! Every rule reports the dotted path of the offending field so startup
//! failures point straight at the TOML key or `MAILRELAY_*` variable.

use std::collections::HashSet;

use validator::{ValidateEmail, ValidateUrl};

use crate::config::environment::Environment;
use crate::config::error::ConfigError;
use crate::config::settings::{
    AuthSettings, FileSettings, LoggerSettings, MailerSettings, ProviderKind, ProviderSettings,
    ServerConfig, Settings,
};
use crate::logger::VALID_LOG_LEVELS;

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// HS256 keys shorter than this are refused
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Published in `config/development.toml`, refused in production
pub const DEVELOPMENT_SIGNING_KEY: &str = "development-signing-key-change-me-0000";
pub const DEVELOPMENT_CLIENT_SECRET: &str = "development-secret";

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::validation("server.host", "Host cannot be empty."));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.file.format",
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - At least one of console and file output is enabled
    /// - File path and format are valid when file output is enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl AuthSettings {
    /// # Validation Rules
    /// - Signing key is at least [`MIN_SIGNING_KEY_LEN`] characters
    /// - Client ids are non-empty and unique
    /// - Client secrets are non-empty
    /// - Attached user emails look like addresses
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::validation(
                "auth.signing_key",
                format!("Signing key must be at least {MIN_SIGNING_KEY_LEN} characters."),
            ));
        }

        let mut seen = HashSet::new();
        for (i, client) in self.clients.iter().enumerate() {
            if client.client_id.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("auth.clients[{i}].client_id"),
                    "Client id cannot be empty.".to_string(),
                ));
            }
            if !seen.insert(client.client_id.as_str()) {
                return Err(ConfigError::validation(
                    format!("auth.clients[{i}].client_id"),
                    format!("Duplicate client id '{}'.", client.client_id),
                ));
            }
            if client.secret.is_empty() {
                return Err(ConfigError::validation(
                    format!("auth.clients[{i}].secret"),
                    "Client secret cannot be empty.".to_string(),
                ));
            }
            if let Some(user) = &client.user
                && !user.email.validate_email()
            {
                return Err(ConfigError::validation(
                    format!("auth.clients[{i}].user.email"),
                    format!("'{}' is not a valid email address.", user.email),
                ));
            }
        }

        Ok(())
    }
}

impl ProviderSettings {
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation(
                format!("{field}.name"),
                "Provider name cannot be empty.".to_string(),
            ));
        }

        if self.priority == 0 {
            return Err(ConfigError::validation(
                format!("{field}.priority"),
                "Priority must be 1 or greater.".to_string(),
            ));
        }

        if !self.sender.email.validate_email() {
            return Err(ConfigError::validation(
                format!("{field}.sender.email"),
                format!("'{}' is not a valid email address.", self.sender.email),
            ));
        }

        if self.credentials.timeout_seconds == 0 {
            return Err(ConfigError::validation(
                format!("{field}.credentials.timeout_seconds"),
                "Timeout must be greater than 0 seconds.".to_string(),
            ));
        }

        match self.kind {
            ProviderKind::Ses => {
                let has_region = self
                    .credentials
                    .region
                    .as_deref()
                    .is_some_and(|r| !r.trim().is_empty());
                if !has_region {
                    return Err(ConfigError::validation(
                        format!("{field}.credentials.region"),
                        "SES providers require a region.".to_string(),
                    ));
                }
                if self.credentials.access_key_id.is_some()
                    != self.credentials.secret_access_key.is_some()
                {
                    return Err(ConfigError::validation(
                        format!("{field}.credentials.secret_access_key"),
                        "access_key_id and secret_access_key must be set together.".to_string(),
                    ));
                }
                if let Some(endpoint) = &self.credentials.endpoint {
                    check_http_url(&format!("{field}.credentials.endpoint"), endpoint)?;
                }
            }
            ProviderKind::Sendgrid => {
                let has_key = self
                    .credentials
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.trim().is_empty());
                if !has_key {
                    return Err(ConfigError::validation(
                        format!("{field}.credentials.api_key"),
                        "SendGrid providers require an api_key.".to_string(),
                    ));
                }
                if let Some(endpoint) = &self.credentials.endpoint {
                    check_http_url(&format!("{field}.credentials.endpoint"), endpoint)?;
                }
            }
            ProviderKind::Webhook => match &self.credentials.endpoint {
                Some(endpoint) => {
                    check_http_url(&format!("{field}.credentials.endpoint"), endpoint)?
                }
                None => {
                    return Err(ConfigError::validation(
                        format!("{field}.credentials.endpoint"),
                        "Webhook providers require an endpoint.".to_string(),
                    ));
                }
            },
            ProviderKind::Mock => {}
        }

        Ok(())
    }
}

fn check_http_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let http = url.starts_with("http://") || url.starts_with("https://");
    if !http || !url.validate_url() {
        return Err(ConfigError::validation(
            field.to_string(),
            format!("'{url}' is not a valid http(s) URL."),
        ));
    }
    Ok(())
}

impl MailerSettings {
    /// # Validation Rules
    /// - Enabled provider names are unique
    /// - Enabled provider priorities are unique and at least 1
    /// - Each enabled provider has the credentials its type needs
    ///
    /// Disabled descriptors are not checked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        let mut priorities = HashSet::new();

        for (i, provider) in self.providers.iter().enumerate() {
            if !provider.enabled {
                continue;
            }
            let field = format!("mailer.providers[{i}]");
            provider.validate(&field)?;

            if !names.insert(provider.name.as_str()) {
                return Err(ConfigError::validation(
                    format!("{field}.name"),
                    format!("Duplicate provider name '{}'.", provider.name),
                ));
            }
            if !priorities.insert(provider.priority) {
                return Err(ConfigError::validation(
                    format!("{field}.priority"),
                    format!("Priority {} is already taken.", provider.priority),
                ));
            }
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all sections, returning the first error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.logger.validate()?;
        self.auth.validate()?;
        self.mailer.validate()?;
        Ok(())
    }

    /// [`Settings::validate`] plus rules that depend on the deployment environment.
    pub fn validate_for(&self, environment: Environment) -> Result<(), ConfigError> {
        self.validate()?;

        if environment.is_production() {
            self.validate_production()?;
        }

        Ok(())
    }

    fn validate_production(&self) -> Result<(), ConfigError> {
        if self.auth.signing_key == DEVELOPMENT_SIGNING_KEY {
            return Err(ConfigError::validation(
                "auth.signing_key",
                "The development signing key cannot be used in production. \
                 Set MAILRELAY_AUTH__SIGNING_KEY.",
            ));
        }

        if let Some(i) = self
            .auth
            .clients
            .iter()
            .position(|c| c.secret == DEVELOPMENT_CLIENT_SECRET)
        {
            return Err(ConfigError::validation(
                format!("auth.clients[{i}].secret"),
                "The development client secret cannot be used in production.".to_string(),
            ));
        }

        if let Some(mock) = self
            .mailer
            .enabled_providers()
            .find(|p| p.kind == ProviderKind::Mock)
        {
            return Err(ConfigError::validation(
                "mailer.providers",
                format!("Mock provider '{}' cannot be enabled in production.", mock.name),
            ));
        }

        Ok(())
    }
}
