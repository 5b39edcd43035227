pub mod health;
pub mod mail;
pub mod metrics;
