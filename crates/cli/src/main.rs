use std::{fs::OpenOptions, sync::Arc};

use anyhow::{Context, Result};
use gamesync_core::{AssetSync, GcsClient, SyncConfig, SyncTarget};
use tracing_subscriber::{prelude::*, EnvFilter};

const USAGE: &str = "Usage: sync_games <gameId> <version>";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((game_id, version)) = parse_args(&args) else {
        println!("{USAGE}");
        std::process::exit(1);
    };

    let config = SyncConfig::load()?;
    init_logging(&config)?;

    let target = SyncTarget::new(game_id, version)?;
    let store = GcsClient::connect(&config)
        .await
        .context("failed to set up storage client")?;
    let sync = AssetSync::new(config, store)?;

    let report = sync
        .run(&target)
        .await
        .with_context(|| format!("failed to sync {target}"))?;

    println!(
        "✅ {} files synced into {}",
        report.files,
        report.root.display()
    );
    Ok(())
}

/// Exactly two positional arguments: game id and version.
fn parse_args(args: &[String]) -> Option<(&str, &str)> {
    match args {
        [game_id, version] => Some((game_id.as_str(), version.as_str())),
        _ => None,
    }
}

fn init_logging(config: &SyncConfig) -> Result<()> {
    let env_filter = EnvFilter::from_default_env();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stdout);

    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .compact()
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
