//! VidQuery Loader
//!
//! Loads the video dataset from a JSON file into PostgreSQL. Existing ids are
//! left untouched, so the same file can be loaded twice.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... vidquery-loader data/videos.json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidquery_db::{Database, DatabaseConfig, Dataset};

/// VidQuery Loader - import videos and snapshots from JSON
#[derive(Parser, Debug)]
#[command(name = "vidquery-loader")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file: an array of videos or an object with a `videos` array
    path: PathBuf,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VIDQUERY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "VIDQUERY_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Skip migrations before loading
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    init_logging(&args.log_level, &args.log_format)?;

    let raw = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let dataset = Dataset::from_slice(&raw)
        .with_context(|| format!("Failed to parse {}", args.path.display()))?;
    tracing::info!(
        path = %args.path.display(),
        videos = dataset.videos.len(),
        snapshots = dataset.snapshots.len(),
        skipped = dataset.skipped,
        "Parsed dataset"
    );

    if dataset.is_empty() {
        tracing::warn!("Nothing to load: no usable videos in the input");
        println!("Нет данных для загрузки. Проверь JSON.");
        return Ok(());
    }

    let config = DatabaseConfig {
        run_migrations: !args.no_migrate,
        ..DatabaseConfig::with_url(args.database_url)
    };

    let db = Database::connect(&config).await?;
    if config.run_migrations {
        db.migrate().await?;
    }

    let result = db.import(&dataset).await;
    db.close().await;
    let stats = result?;

    tracing::info!(
        videos = stats.videos,
        snapshots = stats.snapshots,
        "Import complete"
    );
    println!(
        "Загружено {} видео и {} снапшотов",
        stats.videos, stats.snapshots
    );

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(level: &str, format: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match format {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().pretty().with_target(true))
            .try_init()?,
    }

    Ok(())
}
