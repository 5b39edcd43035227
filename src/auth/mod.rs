//! Client authentication and bearer tokens
//!
//! [`AuthServer`] checks client credentials against a [`CredentialStore`] and
//! issues short-lived HS256 tokens. [`RequestContext`] carries the presented
//! token, and once validated its [`Claims`], through the service pipeline.

pub mod claims;
pub mod context;
pub mod secret;
pub mod server;
pub mod store;

pub use claims::Claims;
pub use context::{Credential, RequestContext};
pub use server::{AuthServer, TOKEN_TTL_SECONDS};
pub use store::{ClientCredential, CredentialStore, InMemoryCredentialStore};
