//! HTTP transport for the mailer pipeline.
//!
//! Handlers translate JSON requests into [`MailerService`] calls and map
//! [`AppError`] back to status codes. They never touch providers or the
//! auth server directly.
//!
//! [`MailerService`]: crate::services::pipeline::MailerService
//! [`AppError`]: crate::error::AppError

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
