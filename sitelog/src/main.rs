// sitelog - architectural site-visit journal
// Entry point: opens the data directory, runs the startup migration and
// reports what is stored.

use anyhow::Context;
use sitelog::app::AppSession;
use sitelog::config::{DATA_DIR_ENV, DEFAULT_DATA_DIR};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitelog=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sitelog");

    let data_dir = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let session = AppSession::init(&data_dir)
        .await
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;

    let report = session.migration_report();
    tracing::info!(
        "Startup migration: {} posts scanned, {} images migrated, {} kept inline",
        report.posts_scanned,
        report.images_migrated,
        report.images_failed
    );

    match session.current_user().await {
        Ok(Some(user)) => tracing::info!("Logged in as {}", user.name),
        Ok(None) => tracing::info!("Nobody is logged in"),
        Err(e) => tracing::warn!("Could not read session: {}", e.user_message()),
    }

    match session.posts().feed().await {
        Ok(feed) => tracing::info!("{} posts in feed", feed.len()),
        Err(e) => tracing::warn!("Could not load feed: {}", e.user_message()),
    }

    session.shutdown().await;

    Ok(())
}
