//! `mail-tracker` command line.
//!
//! # Usage
//!
//! ```bash
//! # Serve pixels, resolving opens against a recipients file
//! mail-tracker serve --recipients recipients.json
//!
//! # Print tracking links (or <img> tags) for identifiers
//! mail-tracker link 12 13
//! mail-tracker link --html 12
//! ```
//!
//! Configuration comes from environment variables (and `.env`), see
//! [`mail_tracker::config`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mail_tracker::config::{self, Config};
use mail_tracker::recipients::RecipientDirectory;
use mail_tracker::server;
use mail_tracker::{OpenEvent, Tracker};
use tracing_subscriber::EnvFilter;

/// Email open tracking server.
#[derive(Parser)]
#[command(name = "mail-tracker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tracking pixels until interrupted
    Serve {
        /// JSON array of {"id", "email"} used to name recipients in open logs
        #[arg(short, long)]
        recipients: Option<PathBuf>,
    },

    /// Print tracking links for identifiers
    Link {
        /// Recipient identifiers
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print an invisible <img> tag instead of the bare URL
        #[arg(long)]
        html: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;
    init_tracing(&config)?;

    match cli.command {
        Commands::Serve { recipients } => serve(&config, recipients).await,
        Commands::Link { ids, html } => print_links(&config, &ids, html),
    }
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("Invalid RUST_LOG '{}'", config.log_level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

async fn serve(config: &Config, recipients: Option<PathBuf>) -> Result<()> {
    config.print_summary();

    match recipients {
        Some(path) => {
            let directory = RecipientDirectory::load(&path)?;
            tracing::info!("Loaded {} recipients from {}", directory.len(), path.display());
            server::run(config, directory).await
        }
        None => {
            server::run(config, |event: OpenEvent| match serde_json::to_string(&event) {
                Ok(json) => tracing::info!(event = %json, "Email opened"),
                Err(e) => tracing::error!("Failed to serialize open event: {}", e),
            })
            .await
        }
    }
}

fn print_links(config: &Config, ids: &[String], html: bool) -> Result<()> {
    let tracker = Tracker::new(config.tracker_config(), |_: OpenEvent| {})?;
    let links = tracker.links();

    for id in ids {
        if html {
            println!("{}", links.img_tag(id));
        } else {
            println!("{id}\t{}", links.link(id));
        }
    }

    Ok(())
}
