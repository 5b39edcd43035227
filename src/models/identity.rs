//! Caller identity records

use serde::{Deserialize, Serialize};

use crate::config::UserSettings;

/// User attached to a client credential. Copied into token claims and used
/// as the sender of every email the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
}

impl From<UserSettings> for User {
    fn from(settings: UserSettings) -> Self {
        Self {
            id: settings.id,
            username: settings.username,
            name: settings.name,
            email: settings.email,
        }
    }
}
