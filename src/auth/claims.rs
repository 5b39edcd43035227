use serde::{Deserialize, Serialize};

use crate::models::{Sender, User};

/// Token payload. Field names match the JSON emitted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "clientID")]
    pub client_id: String,

    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issued at, unix seconds
    pub iat: i64,

    /// Expires at, unix seconds, exclusive
    pub exp: i64,
}

impl Claims {
    pub fn new(client_id: impl Into<String>, user: Option<&User>, issued_at: i64, ttl: i64) -> Self {
        Self {
            client_id: client_id.into(),
            user_id: user.map(|u| u.id.clone()),
            username: user.map(|u| u.username.clone()),
            name: user.map(|u| u.name.clone()),
            email: user.map(|u| u.email.clone()),
            iat: issued_at,
            exp: issued_at + ttl,
        }
    }

    /// `true` when `now` falls in `[iat, exp)`.
    pub fn is_live_at(&self, now: i64) -> bool {
        self.iat <= now && now < self.exp
    }

    /// Sender identity for mail sent by this caller, if the client has a user.
    pub fn sender(&self) -> Option<Sender> {
        let email = self.email.as_ref()?;
        let name = self
            .name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_default();
        Some(Sender::new(name, email.clone()))
    }
}
