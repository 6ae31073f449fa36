use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use event_scheduler::cli::{self, Cli, Commands};
use event_scheduler::config::{AppConfig, Settings};
use event_scheduler::runtime;
use event_scheduler::service::EventService;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let filter = if args.verbose {
        "event_scheduler=debug"
    } else {
        "event_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(path).with_context(|| format!("Unable to load config {}", path))?,
        None => AppConfig::default(),
    };
    let settings = Settings::resolve(&config)?;
    let shared_store = runtime::open_store(&settings);

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => runtime::run_api(shared_store, settings).await,
        Commands::Event(command) => {
            let service = EventService::new(shared_store);
            let output = cli::execute(&service, command).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}
