//! CLI entry point for Palm Reader.
//!
//! The `palmreader` binary drives the session state machine from a
//! terminal: an interactive shell standing in for the app's screens, plus
//! a few one-shot maintenance commands.

mod config;
mod helpers;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use palmreader_session::InMemoryHistory;

use crate::config::Config;
use crate::helpers::{init_tracing, start_app};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Palm Reader: readings, guidance and chat, stored on this device.
#[derive(Parser)]
#[command(
    name = "palmreader",
    version,
    about = "Palm Reader headless shell",
    long_about = "Drives the Palm Reader session and local store from the terminal. \
                  All data stays in the configured data directory."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and enter the interactive shell.
    Run,

    /// Show the screen a cold start would open and what is stored.
    Status,

    /// Delete every saved reading.
    ClearReadings,

    /// Delete the chat history.
    ClearChat,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run => {
            init_tracing(&config.log.level);
            repl::cmd_run(&config).await
        }
        Commands::Status => {
            init_tracing("warn");
            cmd_status(&config).await
        }
        Commands::ClearReadings => {
            init_tracing(&config.log.level);
            cmd_clear_readings(&config).await
        }
        Commands::ClearChat => {
            init_tracing(&config.log.level);
            cmd_clear_chat(&config).await
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

async fn cmd_status(config: &Config) -> Result<()> {
    let app = start_app(config, Arc::new(InMemoryHistory::new())).await?;
    let chat = app
        .conversation
        .history()
        .await
        .context("failed to read chat history")?;
    let state = app.session.snapshot();

    println!();
    println!("  Palm Reader Status");
    println!("  ==================");
    println!();
    println!("  Data directory:   {}", config.store.data_dir.display());
    println!("  Schema version:   {}", app.db.version());
    println!("  Start screen:     {}", state.view);
    println!("  Language:         {}", state.language);
    match app.user.profile() {
        Some(profile) if profile.is_complete() => println!("  Profile:          {}", profile.name),
        Some(_) => println!("  Profile:          INCOMPLETE"),
        None => println!("  Profile:          NOT SET"),
    }
    println!("  Readings:         {}", app.user.readings().len());
    println!("  Chat messages:    {}", chat.len());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands: clear
// ---------------------------------------------------------------------------

async fn cmd_clear_readings(config: &Config) -> Result<()> {
    let app = start_app(config, Arc::new(InMemoryHistory::new())).await?;
    let count = app.user.readings().len();
    app.user
        .clear_readings()
        .await
        .context("failed to clear readings")?;
    println!("  Removed {count} reading(s).");
    Ok(())
}

async fn cmd_clear_chat(config: &Config) -> Result<()> {
    let app = start_app(config, Arc::new(InMemoryHistory::new())).await?;
    let count = app.conversation.history().await?.len();
    app.conversation
        .clear()
        .await
        .context("failed to clear chat history")?;
    println!("  Removed {count} chat message(s).");
    Ok(())
}
