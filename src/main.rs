use clap::Parser;

use mailrelay::cli::{Cli, execute_command, init_logger_from_settings, load_and_merge_config};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        tracing::error!(error = %format!("{e:#}"), "Fatal error");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = load_and_merge_config(cli)?;

    if !cli.is_dry_run() {
        init_logger_from_settings(&settings)?;
    }

    execute_command(cli, settings).await?;
    Ok(())
}
