//! Delicious CLI - database migrations and sample data.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! delicious-cli migrate
//!
//! # Load the sample stores, users and reviews
//! delicious-cli seed --file crates/cli/data/sample.yaml
//!
//! # Wipe stores, reviews and users first
//! delicious-cli seed --file crates/cli/data/sample.yaml --clear
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Load users, stores and reviews from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "delicious-cli")]
#[command(author, version, about = "Delicious CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load sample data from a YAML file
    Seed {
        /// Path to the YAML file
        #[arg(short, long, default_value = "crates/cli/data/sample.yaml")]
        file: PathBuf,

        /// Delete all stores, reviews and users first
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, clear } => commands::seed::run(&file, clear).await?,
    }
    Ok(())
}
