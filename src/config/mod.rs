//! Layered configuration for mailrelay
//!
//! # Configuration Priority (lowest to highest)
//! 1. `default.toml` - Base configuration, always required
//! 2. `{environment}.toml` - Environment-specific overrides
//! 3. `local.toml` - Machine-local overrides (not committed)
//! 4. `MAILRELAY_*` environment variables, `__` separating nested keys
//!
//! Provider descriptors and client credentials both live here; see
//! [`settings::MailerSettings`] and [`settings::AuthSettings`].

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use loader::ConfigLoader;
pub use settings::{
    AuthSettings, ClientSettings, MailerSettings, ProviderCredentials, ProviderKind,
    ProviderSettings, SenderSettings, ServerConfig, Settings, UserSettings,
};
