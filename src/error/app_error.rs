use thiserror::Error;
use uuid::Uuid;

use crate::config::error::ConfigError;

/// Application-wide error type that represents all possible errors in the system.
///
/// Provider-level failures never appear here directly: providers report a
/// [`DeliveryError`](crate::services::mailer::DeliveryError) and the dispatch
/// service folds exhausted attempts into [`AppError::Delivery`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Client id unknown or secret mismatch
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bearer token failed signature, shape or lifetime checks
    #[error("Invalid token")]
    InvalidToken,

    /// No usable bearer token was presented
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    /// The provider registry is empty
    #[error("No mail provider configured")]
    NoProviderConfigured,

    /// Operation intentionally left unimplemented
    #[error("Not implemented: {operation}")]
    NotImplemented { operation: String },

    /// Every provider in the chain failed for this email
    #[error("Email '{email_id}' cannot be sent: {reason}")]
    Delivery { email_id: Uuid, reason: String },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Shorthand for a configuration error carrying a plain message.
    pub fn configuration(key: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Configuration {
            key: key.into(),
            source: anyhow::anyhow!(message.into()),
        }
    }

    /// Stable machine-readable code, also used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::BadRequest { .. } => "BAD_REQUEST",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Unauthenticated { .. } => "UNAUTHENTICATED",
            AppError::NoProviderConfigured => "NO_PROVIDER_CONFIGURED",
            AppError::NotImplemented { .. } => "NOT_IMPLEMENTED",
            AppError::Delivery { .. } => "DELIVERY_FAILED",
            AppError::Configuration { .. } => "CONFIGURATION_ERROR",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = match &error {
            ConfigError::ValidationError { field, .. } => field.clone(),
            _ => "settings".to_string(),
        };
        AppError::Configuration {
            key,
            source: error.into(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, reason) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), reason)
            })
            .unwrap_or_else(|| ("request".to_string(), errors.to_string()));
        AppError::Validation { field, reason }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_names_email_id() {
        let id = Uuid::new_v4();
        let err = AppError::Delivery {
            email_id: id,
            reason: "sendgrid: rejected".to_string(),
        };
        assert!(err.to_string().contains(&id.to_string()));
        assert_eq!(err.code(), "DELIVERY_FAILED");
    }

    #[test]
    fn test_config_error_conversion_keeps_field() {
        let err: AppError = ConfigError::validation("auth.signing_key", "too short").into();
        match err {
            AppError::Configuration { key, .. } => assert_eq!(key, "auth.signing_key"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_anyhow_conversion_is_internal() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(err.to_string(), "Internal error");
    }
}
