//! Dispatches the parsed command.

use super::handlers::ServeCommandHandler;
use super::parser::{Cli, Commands};
use crate::config::Settings;
use crate::error::AppResult;

/// Run the selected command with already merged settings. `serve` without
/// `--dry-run` blocks until the server shuts down.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    match &cli.command {
        Some(Commands::Serve { dry_run, .. }) => {
            ServeCommandHandler::new(settings).execute(*dry_run).await
        }
        None => ServeCommandHandler::new(settings).execute(false).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::tests::MINIMAL_DEFAULT;
    use clap::Parser;

    #[tokio::test]
    async fn test_execute_serve_dry_run() {
        let cli = Cli::try_parse_from(["mailrelay", "serve", "--dry-run"]).unwrap();
        let settings: Settings = toml::from_str(MINIMAL_DEFAULT).unwrap();

        assert!(execute_command(&cli, settings).await.is_ok());
    }
}
