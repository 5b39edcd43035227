//! Request and response bodies for the HTTP API.

mod error;
mod health;
mod mail;

pub use error::ErrorResponse;
pub use health::{HealthResponse, HealthStatus, ProviderHealth};
pub use mail::{SendRequest, SendResponse, SignInRequest, SignInResponse, SignOutRequest};
