//! Mail provider capability and the failure types it reports.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ProviderSettings;
use crate::error::AppResult;
use crate::models::{Email, Sender};

/// Backend-specific failure classes, normalized at the provider boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Backend refused the message itself
    Rejected,
    /// Sender domain is not verified with the backend
    DomainNotVerified,
    /// Bad credentials or account setup
    Configuration,
    /// Backend could not be reached
    Transport,
    Unclassified,
}

impl FailureKind {
    /// Whether dispatch should move on to the next provider.
    ///
    /// Every class currently retries. Narrow this to stop failover for
    /// failures another provider cannot fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureKind::Rejected
            | FailureKind::DomainNotVerified
            | FailureKind::Configuration
            | FailureKind::Transport
            | FailureKind::Unclassified => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Rejected => "rejected",
            FailureKind::DomainNotVerified => "domain_not_verified",
            FailureKind::Configuration => "configuration",
            FailureKind::Transport => "transport",
            FailureKind::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed send attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct DeliveryError {
    pub kind: FailureKind,
    pub message: String,
}

impl DeliveryError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    /// The retry signal of the attempt.
    pub fn retry(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// A delivery backend.
///
/// `send` returning `Ok` means the backend accepted the message. Providers
/// start not ready; `start` makes them ready and `stop` reverses it.
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), DeliveryError>;

    async fn start(&self) -> AppResult<()>;

    async fn stop(&self) -> AppResult<()>;

    fn name(&self) -> &str;

    fn priority(&self) -> u32;

    fn is_ready(&self) -> bool;
}

/// Descriptor fields and readiness flag shared by every provider.
#[derive(Debug)]
pub struct ProviderInfo {
    pub name: String,
    pub priority: u32,
    pub sender: Sender,
    ready: AtomicBool,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, priority: u32, sender: Sender) -> Self {
        Self {
            name: name.into(),
            priority,
            sender,
            ready: AtomicBool::new(false),
        }
    }

    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(
            settings.name.clone(),
            settings.priority,
            Sender::new(settings.sender.name.clone(), settings.sender.email.clone()),
        )
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }
}
