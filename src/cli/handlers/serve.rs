//! `serve` command.

use crate::config::Settings;
use crate::error::AppResult;
use crate::server::Server;

pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            self.validate_only()
        } else {
            Server::new(self.config).run().await
        }
    }

    /// Print what the server would do with the merged settings. Providers
    /// are not started.
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        println!(
            "✓ {} client credential(s) configured",
            self.config.auth.clients.len()
        );

        let mut providers: Vec<_> = self.config.mailer.enabled_providers().collect();
        providers.sort_by_key(|p| p.priority);
        if providers.is_empty() {
            println!("! No providers enabled, every send will fail");
        }
        for provider in providers {
            println!(
                "✓ Provider {} ({}) at priority {}",
                provider.name, provider.kind, provider.priority
            );
        }

        println!("Dry run completed successfully");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
