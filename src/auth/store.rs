use std::collections::HashMap;

use crate::auth::secret::hash_secret;
use crate::config::ClientSettings;
use crate::error::AppResult;
use crate::models::User;

/// A registered client as the auth server sees it.
#[derive(Debug, Clone)]
pub struct ClientCredential {
    pub client_id: String,
    /// Argon2 PHC string, never the plain secret
    pub secret_hash: String,
    pub user: Option<User>,
}

/// Lookup of client credentials by id.
///
/// The auth server only reads through this trait, so a persistent backend
/// can replace [`InMemoryCredentialStore`] without touching token logic.
pub trait CredentialStore: Send + Sync {
    fn client(&self, client_id: &str) -> Option<ClientCredential>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed credential directory built once at startup.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    clients: HashMap<String, ClientCredential>,
}

impl InMemoryCredentialStore {
    /// Hash every configured secret. Plain secrets are not retained.
    pub fn from_settings(clients: &[ClientSettings]) -> AppResult<Self> {
        let clients = clients
            .iter()
            .map(|c| {
                let credential = ClientCredential {
                    client_id: c.client_id.clone(),
                    secret_hash: hash_secret(&c.secret)?,
                    user: c.user.clone().map(User::from),
                };
                Ok((c.client_id.clone(), credential))
            })
            .collect::<AppResult<HashMap<_, _>>>()?;

        Ok(Self { clients })
    }

    pub fn insert(&mut self, credential: ClientCredential) {
        self.clients.insert(credential.client_id.clone(), credential);
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn client(&self, client_id: &str) -> Option<ClientCredential> {
        self.clients.get(client_id).cloned()
    }

    fn len(&self) -> usize {
        self.clients.len()
    }
}
