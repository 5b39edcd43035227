//! Mail delivery and the service pipeline wrapped around it.

pub mod mailer;
pub mod pipeline;
