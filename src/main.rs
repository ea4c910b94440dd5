mod audit;
mod config;
mod error;
mod matcher;
mod models;
mod notify;
mod runner;
mod scrapers;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use dialoguer::Select;
use runner::Runner;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apartment-scout", about = "Watches rental sites and reports new matching apartments")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "scraper_config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Run a single pass and print the new listings
    Once,
    /// Keep running passes on the configured interval
    Watch,
    /// Print the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_init(&cli.config).await?;

    let command = match cli.command {
        Some(command) => command,
        None => match prompt_command()? {
            Some(command) => command,
            None => return Ok(()),
        },
    };

    match command {
        Command::Once => run_once(&config).await,
        Command::Watch => watch(&config).await,
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            Ok(())
        }
    }
}

fn prompt_command() -> Result<Option<Command>> {
    println!("🏠 Apartment Scout");
    println!("{}", "=".repeat(40));

    let options = [
        "Run a single pass",
        "Start continuous scraping",
        "Show configuration",
    ];
    let choice = Select::new()
        .with_prompt("Choose an option")
        .items(&options)
        .default(0)
        .interact_opt()?;

    Ok(choice.map(|idx| match idx {
        0 => Command::Once,
        1 => Command::Watch,
        _ => Command::Config,
    }))
}

async fn run_once(config: &Config) -> Result<()> {
    let mut runner = Runner::from_config(config).await?;

    let report = match runner.run_once().await {
        Ok(report) => report,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Pass failed");
            return Err(e.into());
        }
    };

    println!("\n✅ {} new apartments found!", report.new_listings.len());
    for (i, listing) in report.new_listings.iter().enumerate() {
        println!("\n{}. {}", i + 1, listing.title);
        println!("   💰 {} | 📍 {}", listing.price, listing.location);
        println!("   🔗 {}", listing.url);
    }
    Ok(())
}

async fn watch(config: &Config) -> Result<()> {
    let mut runner = Runner::from_config(config).await?;
    let shutdown = CancellationToken::new();

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping after the current pass");
            signal.cancel();
        }
    });

    runner.run_continuous(shutdown).await;
    Ok(())
}
