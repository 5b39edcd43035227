//! Layered configuration loader

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

const CONFIG_DIR_ENV: &str = "MAILRELAY_CONFIG_DIR";
const CONFIG_FILE_ENV: &str = "MAILRELAY_CONFIG_FILE";
const DEFAULT_CONFIG_DIR: &str = "config";

/// `MAILRELAY_SERVER__PORT` maps to `server.port`
const ENV_PREFIX: &str = "MAILRELAY";
const ENV_SEPARATOR: &str = "__";

/// Loads [`Settings`] from files and environment variables.
///
/// Sources in order of priority, lowest first:
/// 1. `default.toml` (required)
/// 2. `{environment}.toml`
/// 3. `local.toml`
/// 4. `MAILRELAY_*` environment variables
///
/// When a single config file is selected, steps 1-3 are replaced by that file.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Build a loader from `MAILRELAY_CONFIG_DIR`, `MAILRELAY_CONFIG_FILE` and
    /// `MAILRELAY_APP_ENV`.
    ///
    /// # Errors
    ///
    /// Fails if both the config dir and config file variables are set.
    pub fn new() -> Result<Self, ConfigError> {
        let dir_var = std::env::var(CONFIG_DIR_ENV).ok();
        let file_var = std::env::var(CONFIG_FILE_ENV).ok();

        if dir_var.is_some() && file_var.is_some() {
            return Err(ConfigError::mutual_exclusivity(format!(
                "{CONFIG_DIR_ENV} and {CONFIG_FILE_ENV} cannot both be set. \
                 Use {CONFIG_DIR_ENV} for layered configuration or \
                 {CONFIG_FILE_ENV} for a single configuration file."
            )));
        }

        Ok(Self {
            config_dir: dir_var
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file: file_var.map(PathBuf::from),
            environment: AppEnvironment::from_env(),
        })
    }

    /// Load a single file instead of the layered directory.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self.config_file = None;
        self
    }

    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load, deserialize and validate the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `default.toml` (or the selected file) is missing,
    /// parsing fails, or validation fails.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let settings = self.load_unvalidated()?;
        settings.validate_for(self.environment)?;
        Ok(settings)
    }

    /// Load and deserialize without running validation.
    pub fn load_unvalidated(&self) -> Result<Settings, ConfigError> {
        self.build_config()?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize configuration: {e}")))
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = match &self.config_file {
            Some(file) => add_file_source(builder, file, true)?,
            None => self.add_layered_sources(builder)?,
        };

        add_env_source(builder).build().map_err(ConfigError::from)
    }

    fn add_layered_sources(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = add_file_source(builder, &self.config_dir.join("default.toml"), true)?;

        let env_file = format!("{}.toml", self.environment.as_str());
        let builder = add_file_source(builder, &self.config_dir.join(env_file), false)?;

        add_file_source(builder, &self.config_dir.join("local.toml"), false)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        })
    }
}

fn add_file_source(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if required && !path.exists() {
        return Err(ConfigError::file_not_found(format!(
            "Required configuration file not found: {}",
            path.display()
        )));
    }

    let name = path
        .to_str()
        .ok_or_else(|| ConfigError::ParseError(format!("Non UTF-8 path: {}", path.display())))?;

    Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
}

fn add_env_source(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .ignore_empty(true)
            .try_parsing(true),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serializes tests that touch process environment variables.
    pub(crate) static ENV_MUTEX: Mutex<()> = Mutex::new(());

    pub(crate) const MINIMAL_DEFAULT: &str = r#"
        [auth]
        signing_key = "0123456789abcdef0123456789abcdef"

        [[auth.clients]]
        client_id = "dd74cb9cfb5a4f1cac4d"
        secret = "s3cret"

        [[mailer.providers]]
        name = "local"
        type = "mock"
        priority = 1
        sender = { name = "Local", email = "noreply@localhost.test" }
    "#;

    pub(crate) fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).expect("Failed to write config file");
        }
        temp_dir
    }

    /// Restores touched environment variables on drop.
    pub(crate) struct EnvGuard {
        vars_to_restore: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        pub(crate) fn new() -> Self {
            Self {
                vars_to_restore: Vec::new(),
            }
        }

        pub(crate) fn set(&mut self, key: &str, value: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        pub(crate) fn remove(&mut self, key: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original) in self.vars_to_restore.iter().rev() {
                unsafe {
                    match original {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    fn clean_env() -> EnvGuard {
        let mut env = EnvGuard::new();
        env.remove(CONFIG_DIR_ENV);
        env.remove(CONFIG_FILE_ENV);
        env.remove(AppEnvironment::ENV_VAR);
        env.remove("MAILRELAY_SERVER__PORT");
        env
    }

    #[test]
    fn test_new_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _env = clean_env();

        let loader = ConfigLoader::new().unwrap();
        assert_eq!(loader.config_dir(), Path::new("config"));
        assert!(loader.config_file.is_none());
        assert_eq!(loader.environment(), AppEnvironment::Development);
    }

    #[test]
    fn test_dir_and_file_are_mutually_exclusive() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = clean_env();
        env.set(CONFIG_DIR_ENV, "/etc/mailrelay");
        env.set(CONFIG_FILE_ENV, "/etc/mailrelay/app.toml");

        let err = ConfigLoader::new().unwrap_err();
        assert!(matches!(err, ConfigError::MutualExclusivityError(_)));
    }

    #[test]
    fn test_missing_default_toml() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _env = clean_env();
        let dir = setup_config_dir(&[]);

        let err = ConfigLoader::new().unwrap().with_dir(dir.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_layer_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = clean_env();
        let dir = setup_config_dir(&[
            ("default.toml", MINIMAL_DEFAULT),
            ("staging.toml", "[server]\nport = 9000\nhost = \"0.0.0.0\"\n"),
            ("local.toml", "[server]\nport = 9100\n"),
        ]);
        env.set("MAILRELAY_LOGGER__LEVEL", "warn");

        let settings = ConfigLoader::new()
            .unwrap()
            .with_dir(dir.path())
            .with_environment(AppEnvironment::Staging)
            .load()
            .unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.logger.level, "warn");
        assert_eq!(settings.mailer.providers.len(), 1);
    }

    #[test]
    fn test_env_var_overrides_nested_key() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = clean_env();
        let dir = setup_config_dir(&[("default.toml", MINIMAL_DEFAULT)]);
        env.set("MAILRELAY_SERVER__PORT", "7001");

        let settings = ConfigLoader::new().unwrap().with_dir(dir.path()).load().unwrap();
        assert_eq!(settings.server.port, 7001);
    }

    #[test]
    fn test_single_file_mode_skips_layers() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _env = clean_env();
        let dir = setup_config_dir(&[
            ("custom.toml", MINIMAL_DEFAULT),
            ("local.toml", "[server]\nport = 9100\n"),
        ]);

        let settings = ConfigLoader::new()
            .unwrap()
            .with_file(dir.path().join("custom.toml"))
            .load()
            .unwrap();
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_validation_runs_against_environment() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _env = clean_env();
        let dir = setup_config_dir(&[("default.toml", MINIMAL_DEFAULT)]);

        let loader = ConfigLoader::new()
            .unwrap()
            .with_dir(dir.path())
            .with_environment(AppEnvironment::Production);

        assert!(matches!(
            loader.load().unwrap_err(),
            ConfigError::ValidationError { .. }
        ));
        assert!(loader.load_unvalidated().is_ok());
    }

    const SHIPPED_DEFAULT: &str = include_str!("../../config/default.toml");
    const SHIPPED_DEVELOPMENT: &str = include_str!("../../config/development.toml");
    const SHIPPED_PRODUCTION: &str = include_str!("../../config/production.toml");

    const SENDGRID_LOCAL: &str = r#"
        [[mailer.providers]]
        name = "sendgrid"
        type = "sendgrid"
        priority = 1
        credentials = { api_key = "SG.live-key" }
        sender = { name = "Acme", email = "noreply@acme.test" }
    "#;

    #[test]
    fn test_shipped_config_loads_in_development() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _env = clean_env();
        let dir = setup_config_dir(&[
            ("default.toml", SHIPPED_DEFAULT),
            ("development.toml", SHIPPED_DEVELOPMENT),
            ("production.toml", SHIPPED_PRODUCTION),
        ]);

        let settings = ConfigLoader::new()
            .unwrap()
            .with_dir(dir.path())
            .with_environment(AppEnvironment::Development)
            .load()
            .unwrap();
        assert_eq!(settings.auth.clients.len(), 1);
        assert_eq!(settings.mailer.providers.len(), 1);
    }

    #[test]
    fn test_production_has_no_signing_key_by_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = clean_env();
        env.remove("MAILRELAY_AUTH__SIGNING_KEY");
        let dir = setup_config_dir(&[
            ("default.toml", SHIPPED_DEFAULT),
            ("development.toml", SHIPPED_DEVELOPMENT),
            ("production.toml", SHIPPED_PRODUCTION),
            ("local.toml", SENDGRID_LOCAL),
        ]);
        let loader = ConfigLoader::new()
            .unwrap()
            .with_dir(dir.path())
            .with_environment(AppEnvironment::Production);

        match loader.load().unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "auth.signing_key"),
            other => panic!("unexpected error: {other:?}"),
        }

        env.set("MAILRELAY_AUTH__SIGNING_KEY", &"p".repeat(48));
        let settings = loader.load().unwrap();
        assert!(settings.auth.clients.is_empty());
    }

    #[test]
    fn test_production_refuses_copied_development_credentials() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = clean_env();
        env.remove("MAILRELAY_AUTH__SIGNING_KEY");
        let dir = setup_config_dir(&[
            ("default.toml", SHIPPED_DEFAULT),
            ("production.toml", SHIPPED_DEVELOPMENT),
            ("local.toml", SENDGRID_LOCAL),
        ]);

        let err = ConfigLoader::new()
            .unwrap()
            .with_dir(dir.path())
            .with_environment(AppEnvironment::Production)
            .load()
            .unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "auth.signing_key"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
