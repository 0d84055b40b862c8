//! Print the clipboard history view for a fixture as JSON
//!
//! Loads entries into the in-memory facility, runs one refresh and prints
//! the published list.
//!
//! Usage:
//!     cargo run --bin clipsill-snapshot -- --history history.json [--settings settings.json]
//!
//! Logging goes to stderr, filtered by RUST_LOG.

use anyhow::{Context, Result};
use clap::Parser;
use clipsill::memory::MemoryClipboard;
use clipsill::{InMemorySettings, RefreshCoordinator, RefreshOutcome, SettingKey, SettingsProvider};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Clipboard history fixture (`{"historyEnabled": true, "entries": [...]}`)
    #[arg(long)]
    history: PathBuf,

    /// Settings document (`{"maximumHistoryCount": 25, "hidePasswords": true, "favoriteItems": []}`)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Toggle the favorite status of these entry ids after the first refresh
    #[arg(long = "favorite", value_name = "ID")]
    favorites: Vec<String>,

    /// Print the updated favorites setting after the view
    #[arg(long)]
    show_favorites: bool,

    #[arg(long)]
    compact: bool,
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let history_json = fs::read_to_string(&args.history)
        .with_context(|| format!("Failed to read {}", args.history.display()))?;
    let clipboard = Arc::new(MemoryClipboard::from_json(&history_json).context("Invalid history fixture")?);

    let settings = match &args.settings {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            InMemorySettings::from_json(&json).context("Invalid settings document")?
        }
        None => InMemorySettings::new(),
    };
    let settings = Arc::new(settings);

    let coordinator = RefreshCoordinator::new(clipboard, settings.clone());
    let mut outcome = coordinator.refresh().await?;

    for id in &args.favorites {
        let (is_favorite, refresh) = coordinator
            .toggle_favorite(id)
            .with_context(|| format!("Cannot toggle favorite {}", id))?;
        tracing::info!(entry_id = %id, is_favorite, "Toggled favorite");
        outcome = refresh.await?;
    }

    match outcome {
        RefreshOutcome::Disabled => eprintln!("Clipboard history is disabled"),
        RefreshOutcome::Unavailable => eprintln!("Clipboard history is unavailable"),
        RefreshOutcome::Published { total, built, .. } => {
            tracing::info!(total, built, "Refresh complete");
        }
    }

    let view = coordinator.view();
    let snapshot: Vec<_> = view.iter().map(|entry| entry.snapshot()).collect();
    let json = if args.compact {
        serde_json::to_string(&snapshot)?
    } else {
        serde_json::to_string_pretty(&snapshot)?
    };
    println!("{}", json);

    if args.show_favorites {
        let favorites = settings.get(SettingKey::FavoriteItems).unwrap_or_default();
        println!("{}", favorites);
    }

    Ok(())
}
