//! agent-insights-sessions - list and inspect team sessions as JSON
//!
//! Mirrors the session endpoints a dashboard would call: list summaries,
//! fetch one reconstructed session, or rediscover and report a count.

use agent_insights_core::{Config, SessionStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agent-insights-sessions")]
#[command(about = "List and inspect team sessions as JSON")]
#[command(version)]
struct Args {
    /// Log root to scan (defaults to ~/.claude/projects)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print summaries of all team sessions, newest first
    List,
    /// Print one fully reconstructed session
    Show {
        /// Session id
        id: String,
    },
    /// Drop cached state, rediscover and print the session count
    Refresh,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(root) = &args.root {
        config.discovery.root = Some(root.clone());
    }

    let _log_guard = agent_insights_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    let store = SessionStore::from_config(&config);

    match args.command {
        Command::List => {
            let summaries = store.list_summaries().context("failed to list sessions")?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Show { id } => {
            let session = store
                .require(&id)
                .with_context(|| format!("failed to load session '{}'", id))?;
            println!("{}", serde_json::to_string_pretty(session.as_ref())?);
        }
        Command::Refresh => {
            let count = store.refresh().context("failed to refresh sessions")?;
            println!("{}", serde_json::json!({ "count": count }));
        }
    }

    Ok(())
}
