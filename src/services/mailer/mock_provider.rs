//! In-memory provider for development and tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::provider::{DeliveryError, FailureKind, MailProvider, ProviderInfo};
use crate::config::ProviderSettings;
use crate::error::AppResult;
use crate::models::{Email, Sender};

/// Records every email it accepts. Can be scripted to fail.
///
/// Ready as soon as it is constructed; `stop` clears readiness and `start`
/// restores it.
#[derive(Debug)]
pub struct MockProvider {
    info: ProviderInfo,
    failure: Mutex<Option<FailureKind>>,
    delivered: Mutex<Vec<Email>>,
    attempts: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self::with_info(ProviderInfo::new(
            name,
            priority,
            Sender::new("Mailrelay", "noreply@localhost"),
        ))
    }

    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::with_info(ProviderInfo::from_settings(settings))
    }

    fn with_info(info: ProviderInfo) -> Self {
        info.set_ready(true);
        Self {
            info,
            failure: Mutex::new(None),
            delivered: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Fail every send with `kind`.
    pub fn failing(self, kind: FailureKind) -> Self {
        self.set_failure(Some(kind));
        self
    }

    pub fn set_failure(&self, kind: Option<FailureKind>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = kind;
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.info.set_ready(ready);
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<Email> {
        self.delivered
            .lock()
            .map(|emails| emails.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MailProvider for MockProvider {
    async fn send(&self, email: &Email) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failure = self.failure.lock().ok().and_then(|f| *f);
        if let Some(kind) = failure {
            return Err(DeliveryError::new(
                kind,
                format!("{} scripted failure", self.info.name),
            ));
        }

        let mut email = email.clone();
        if email.sender.is_none() {
            email.sender = Some(self.info.sender.clone());
        }
        tracing::debug!(provider = %self.info.name, email_id = %email.id, to = %email.to, "Mock delivery");

        self.delivered
            .lock()
            .map_err(|_| DeliveryError::new(FailureKind::Unclassified, "mailbox poisoned"))?
            .push(email);
        Ok(())
    }

    async fn start(&self) -> AppResult<()> {
        self.info.set_ready(true);
        Ok(())
    }

    async fn stop(&self) -> AppResult<()> {
        self.info.set_ready(false);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn priority(&self) -> u32 {
        self.info.priority
    }

    fn is_ready(&self) -> bool {
        self.info.is_ready()
    }
}
