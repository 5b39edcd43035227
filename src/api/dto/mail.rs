//! Mailer request and response payloads.
//!
//! Field names follow the public wire format (`clientID`), so some structs
//! carry explicit renames.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::OutgoingMessage;

#[derive(Deserialize, Validate)]
pub struct SignInRequest {
    #[serde(rename = "clientID")]
    #[validate(length(min = 1, message = "clientID is required"))]
    pub client_id: String,
    #[validate(length(min = 1, message = "secret is required"))]
    pub secret: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("client_id", &self.client_id)
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    pub token: String,
}

/// Body shape only. Field rules are enforced behind authentication, so a
/// missing field reads as empty here.
#[derive(Debug, Deserialize)]
pub struct SignOutRequest {
    #[serde(default)]
    pub id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Blank or whitespace-only addresses mean "not set".
fn present(address: Option<String>) -> Option<String> {
    address.filter(|a| !a.trim().is_empty())
}

impl From<SendRequest> for OutgoingMessage {
    fn from(request: SendRequest) -> Self {
        Self {
            to: request.to,
            cc: present(request.cc),
            bcc: present(request.bcc),
            subject: request.subject,
            body: request.body,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub status: String,
}

impl SendResponse {
    pub fn sent() -> Self {
        Self {
            status: "sent".to_string(),
        }
    }
}
