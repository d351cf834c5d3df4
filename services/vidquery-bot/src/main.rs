//! VidQuery Telegram Bot
//!
//! Answers Russian analytics questions about the video dataset. Each question
//! is translated to one SQL aggregate by the configured LLM, executed
//! read-only against PostgreSQL, and the number is sent back to the chat.
//!
//! # Usage
//!
//! ```bash
//! # Everything from the environment / .env
//! BOT_TOKEN=... DATABASE_URL=postgresql://... OPENAI_API_KEY=... vidquery-bot
//!
//! # With a config file
//! vidquery-bot --config /path/to/config.toml
//!
//! # Nested overrides
//! VIDQUERY__PIPELINE__QUESTION_TIMEOUT_SECS=30 vidquery-bot
//! ```

mod config;
mod handler;
mod poller;
mod telegram;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidquery_db::Database;
use vidquery_llm::LLMRouter;
use vidquery_nlsql::QueryPipeline;

use crate::config::BotConfig;
use crate::poller::Poller;
use crate::telegram::TelegramClient;

// =============================================================================
// CLI Arguments
// =============================================================================

/// VidQuery Bot - video analytics questions over Telegram
#[derive(Parser, Debug)]
#[command(name = "vidquery-bot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "VIDQUERY_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VIDQUERY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "VIDQUERY_LOG_FORMAT")]
    log_format: Option<String>,

    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// LLM provider (openai, gigachat)
    #[arg(long, env = "LLM_PROVIDER")]
    llm_provider: Option<String>,

    /// Model name for the OpenAI provider
    #[arg(long, env = "LLM_MODEL")]
    llm_model: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// GigaChat authorization key
    #[arg(long, env = "GIGACHAT_CREDENTIALS", hide_env_values = true)]
    gigachat_credentials: Option<String>,

    /// GigaChat OAuth scope
    #[arg(long, env = "GIGACHAT_SCOPE")]
    gigachat_scope: Option<String>,

    /// GigaChat model name
    #[arg(long, env = "GIGACHAT_MODEL")]
    gigachat_model: Option<String>,

    /// PEM bundle with the GigaChat CA certificates
    #[arg(long, env = "GIGACHAT_CA_BUNDLE_FILE")]
    gigachat_ca_bundle_file: Option<PathBuf>,

    /// Verify GigaChat TLS certificates (true/false, yes/no, 1/0, any case)
    #[arg(long, env = "GIGACHAT_VERIFY_SSL_CERTS", value_parser = clap::builder::BoolishValueParser::new())]
    gigachat_verify_ssl_certs: Option<bool>,

    /// Skip migrations on startup
    #[arg(long)]
    no_migrate: bool,
}

impl Args {
    /// Load `.env` (or `dotenv_file`) into the process environment, then
    /// parse. Variables set only in `.env` must be visible to the `env`
    /// fallbacks above.
    fn parse_with_dotenv<I, T>(dotenv_file: Option<&Path>, argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let _ = match dotenv_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };
        Self::parse_from(argv)
    }

    /// Apply CLI / well-known environment overrides on top of the layered config
    fn apply(self, config: &mut BotConfig) {
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(token) = self.bot_token {
            config.telegram.token = token;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if let Some(provider) = self.llm_provider {
            config.llm.provider = provider;
        }
        if let Some(model) = self.llm_model {
            config.llm.model = model;
        }
        if let Some(key) = self.openai_api_key {
            config.llm.api_key = Some(key);
        }

        let gigachat = &mut config.llm.gigachat;
        if let Some(credentials) = self.gigachat_credentials {
            gigachat.credentials = Some(credentials);
        }
        if let Some(scope) = self.gigachat_scope {
            gigachat.scope = Some(scope);
        }
        if let Some(model) = self.gigachat_model {
            gigachat.model = Some(model);
        }
        if let Some(path) = self.gigachat_ca_bundle_file {
            gigachat.ca_bundle_file = Some(path);
        }
        if let Some(verify) = self.gigachat_verify_ssl_certs {
            gigachat.verify_ssl_certs = Some(verify);
        }

        if self.no_migrate {
            config.database.run_migrations = false;
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse_with_dotenv(None, std::env::args_os());

    let mut bot_config = BotConfig::load(args.config.as_deref())?;
    args.apply(&mut bot_config);

    init_logging(&bot_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting VidQuery bot"
    );

    bot_config.validate()?;

    // Provider selection is fatal on misconfiguration, so do it before touching the database
    let llm = LLMRouter::from_settings(&bot_config.llm)?;
    if !llm.is_available().await {
        anyhow::bail!("LLM provider {} is not available", llm.provider().name());
    }
    tracing::info!(provider = llm.provider().name(), "LLM provider ready");

    let db = init_database(&bot_config.database).await?;

    let pipeline = Arc::new(QueryPipeline::new(
        llm,
        db.clone(),
        bot_config.pipeline.clone(),
    ));

    let client = Arc::new(TelegramClient::new(&bot_config.telegram)?);

    let poller = Poller::new(
        client,
        pipeline,
        bot_config.telegram.retry_backoff(),
        bot_config.telegram.shutdown_timeout(),
    );
    poller.run(shutdown_signal()).await;

    db.close().await;
    tracing::info!("Bot shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

/// Connect, migrate, health-check and report what is loaded
async fn init_database(config: &vidquery_db::DatabaseConfig) -> anyhow::Result<Arc<Database>> {
    let db = Database::connect(config).await?;

    if config.run_migrations {
        db.migrate().await?;
    }

    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!("Database health check failed");
    }

    let videos = db.video_repo().count().await?;
    let snapshots = db.snapshot_repo().count().await?;
    tracing::info!(videos, snapshots, "Database ready");
    if videos == 0 {
        tracing::warn!("No videos loaded yet, answers will be 0 until vidquery-loader is run");
    }

    Ok(Arc::new(db))
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
