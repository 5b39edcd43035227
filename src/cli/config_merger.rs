//! CLI overrides on top of file and environment configuration.
//!
//! Precedence, lowest first: config files, `MAILRELAY_*` variables, global
//! flags (`--verbose`, `--quiet`), then `serve` arguments. Validation runs
//! once, after every override has been applied.

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Environment, Settings};

pub struct ConfigurationMerger {
    base_config: Settings,
    environment: Environment,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings, environment: Environment) -> Self {
        Self {
            base_config,
            environment,
        }
    }

    /// Load unvalidated settings using the file and environment the CLI
    /// selected, falling back to the loader's own environment lookup.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(path) = &cli.config {
            loader = loader.with_file(path);
        }
        if let Some(env) = cli.env {
            loader = loader.with_environment(env.into());
        }

        Ok(Self::new(loader.load_unvalidated()?, loader.environment()))
    }

    /// Apply CLI overrides and validate the result.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        if let Some(Commands::Serve {
            host,
            port,
            log_level,
            ..
        }) = &cli.command
        {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if let Some(level) = log_level {
                config.logger.level = level.as_str().to_string();
            }
        }

        config.validate_for(self.environment)?;
        Ok(config)
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::tests::MINIMAL_DEFAULT;
    use clap::Parser;

    fn base_config() -> Settings {
        toml::from_str(MINIMAL_DEFAULT).unwrap()
    }

    fn merge(args: &[&str]) -> Result<Settings, ConfigError> {
        let cli = Cli::try_parse_from(args).unwrap();
        ConfigurationMerger::new(base_config(), Environment::Development).merge_cli_args(&cli)
    }

    #[test]
    fn test_no_overrides_keeps_base() {
        let merged = merge(&["mailrelay"]).unwrap();
        assert_eq!(merged, base_config());
    }

    #[test]
    fn test_global_log_flags() {
        assert_eq!(merge(&["mailrelay", "--verbose"]).unwrap().logger.level, "debug");
        assert_eq!(merge(&["mailrelay", "--quiet"]).unwrap().logger.level, "error");
    }

    #[test]
    fn test_serve_overrides() {
        let merged = merge(&["mailrelay", "serve", "--host", "0.0.0.0", "--port", "9025"]).unwrap();
        assert_eq!(merged.server.host, "0.0.0.0");
        assert_eq!(merged.server.port, 9025);
    }

    #[test]
    fn test_command_log_level_overrides_global() {
        let merged = merge(&["mailrelay", "--verbose", "serve", "--log-level", "warn"]).unwrap();
        assert_eq!(merged.logger.level, "warn");
    }

    #[test]
    fn test_merged_config_validated_for_environment() {
        let cli = Cli::try_parse_from(["mailrelay"]).unwrap();
        let merger = ConfigurationMerger::new(base_config(), Environment::Production);

        // The minimal config only has a mock provider
        assert!(merger.merge_cli_args(&cli).is_err());
        assert_eq!(merger.environment(), Environment::Production);
    }
}
