//! Email message model
//!
//! An [`Email`] lives for exactly one send call: it is built by the dispatch
//! service, handed to providers in priority order, then dropped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Sender identity. Always resolved from the authenticated caller or the
/// provider's configuration, never from the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub name: String,
    pub email: String,
}

impl Sender {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// RFC 5322 style `Name <address>`, or the bare address when name is empty.
    pub fn mailbox(&self) -> String {
        if self.name.is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }
}

/// What a caller asks to send, before an id and sender are assigned.
///
/// Checked by the dispatch service once the caller is authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct OutgoingMessage {
    #[validate(email(message = "to must be an email address"))]
    pub to: String,
    #[validate(email(message = "cc must be an email address"))]
    pub cc: Option<String>,
    #[validate(email(message = "bcc must be an email address"))]
    pub bcc: Option<String>,
    #[validate(length(min = 1, max = 998, message = "subject must be 1 to 998 characters"))]
    pub subject: String,
    pub body: String,
}

/// One email with a fresh id, ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub id: Uuid,
    pub sender: Option<Sender>,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub charset: String,
}

impl Email {
    pub fn new(sender: Option<Sender>, message: OutgoingMessage, charset: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            to: message.to,
            cc: message.cc,
            bcc: message.bcc,
            subject: message.subject,
            body: message.body,
            charset: charset.into(),
        }
    }

    /// The sender to put on the wire, falling back to the provider's own.
    pub fn sender_or<'a>(&'a self, fallback: &'a Sender) -> &'a Sender {
        self.sender.as_ref().unwrap_or(fallback)
    }
}
