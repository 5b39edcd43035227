use std::sync::Arc;

use jiff::Timestamp;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::auth::claims::Claims;
use crate::auth::secret::{verify_decoy, verify_secret};
use crate::auth::store::CredentialStore;
use crate::error::{AppError, AppResult};

/// Lifetime of every issued token
pub const TOKEN_TTL_SECONDS: i64 = 240;

/// Why a token was refused. Only logged; callers always see `InvalidToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenRejection {
    Malformed,
    Signature,
    Expired,
    NotYetValid,
    Other,
}

impl From<&jsonwebtoken::errors::Error> for TokenRejection {
    fn from(error: &jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingRequiredClaim(_) => TokenRejection::Malformed,
            ErrorKind::InvalidSignature => TokenRejection::Signature,
            ErrorKind::ExpiredSignature => TokenRejection::Expired,
            ErrorKind::ImmatureSignature => TokenRejection::NotYetValid,
            _ => TokenRejection::Other,
        }
    }
}

/// Issues and validates HS256 bearer tokens for registered clients.
pub struct AuthServer {
    store: Arc<dyn CredentialStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthServer {
    pub fn new(store: Arc<dyn CredentialStore>, signing_key: &[u8]) -> Self {
        // Lifetime is checked against an explicit clock in validate_token_at
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            store,
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            validation,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Exchange client credentials for a signed token.
    pub fn authenticate(&self, client_id: &str, secret: &str) -> AppResult<String> {
        self.authenticate_at(client_id, secret, now())
    }

    /// [`authenticate`](Self::authenticate) with an explicit issue time.
    pub fn authenticate_at(&self, client_id: &str, secret: &str, now: i64) -> AppResult<String> {
        let Some(client) = self.store.client(client_id) else {
            verify_decoy(secret);
            tracing::debug!(client_id, "Unknown client id");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_secret(secret, &client.secret_hash)? {
            tracing::debug!(client_id, "Client secret mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let claims = Claims::new(client_id, client.user.as_ref(), now, TOKEN_TTL_SECONDS);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            AppError::Internal {
                source: anyhow::anyhow!("Failed to sign token: {e}"),
            }
        })
    }

    /// Verify signature and lifetime, returning the embedded claims.
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        self.validate_token_at(token, now())
    }

    /// [`validate_token`](Self::validate_token) against an explicit clock.
    pub fn validate_token_at(&self, token: &str, now: i64) -> AppResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| reject(TokenRejection::from(&e), &e.to_string()))?;

        if !claims.is_live_at(now) {
            return Err(if now < claims.iat {
                reject(TokenRejection::NotYetValid, "issued in the future")
            } else {
                reject(TokenRejection::Expired, "token expired")
            });
        }

        Ok(claims)
    }
}

fn reject(class: TokenRejection, detail: &str) -> AppError {
    tracing::debug!(rejection = ?class, detail, "Token rejected");
    AppError::InvalidToken
}

fn now() -> i64 {
    Timestamp::now().as_second()
}
