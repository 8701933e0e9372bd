//! Peerchat CLI entry point

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use peerchat_cli::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::Result,
    loopback::LoopbackTransport,
    prompt::{format_peer_list, format_status, Prompt},
};
use peerchat_runtime::SessionBuilder;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("peerchat failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_configuration(&cli)?;
    if let Some(name) = &cli.name {
        config = config.with_local_name(name.as_str());
        config.validate()?;
    }

    let builder = SessionBuilder::new(config.session.clone());
    let transport = LoopbackTransport::new(config.loopback.clone(), builder.event_sink());
    let handle = builder.start(transport)?;

    match cli.command {
        Commands::Chat => {
            Prompt::new(handle.clone(), config.cli.clone()).run().await?;
        }
        Commands::Status { wait } => {
            tokio::time::sleep(Duration::from_secs(wait)).await;
            let snapshot = handle.snapshot().await?;
            println!("{}", format_status(&snapshot));
            println!("{}", format_peer_list(&snapshot));
        }
    }

    handle.shutdown().await;
    info!("peerchat exited");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        info!("Loading configuration from: {}", config_path);
        Ok(AppConfig::load_from_file(config_path)?)
    } else {
        info!("Using default configuration");
        Ok(AppConfig::default())
    }
}
