//! Bot Configuration
//!
//! Layered: an optional config file, `config/default`, `config/local`, then
//! `VIDQUERY__*` environment variables. `main` loads `.env` before anything
//! else, then applies CLI flags and the well-known variables (`BOT_TOKEN`,
//! `DATABASE_URL`, ...) on top.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use vidquery_db::DatabaseConfig;
use vidquery_llm::LLMSettings;
use vidquery_nlsql::PipelineConfig;

/// Bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram transport settings
    #[serde(default)]
    pub telegram: TelegramSettings,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMSettings,

    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram Bot API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Bot token from @BotFather
    #[serde(default)]
    pub token: String,

    /// Bot API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Long-poll timeout passed to `getUpdates`, in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Pause after a failed poll, in seconds
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,

    /// How long to wait for in-flight answers on shutdown, in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
            retry_backoff_secs: default_retry_backoff(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl TelegramSettings {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_retry_backoff() -> u64 {
    3
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl BotConfig {
    /// Load configuration from environment and optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        builder = builder.add_source(
            config::Environment::with_prefix("VIDQUERY")
                .separator("__")
                .try_parsing(true),
        );

        let bot_config: BotConfig = builder.build()?.try_deserialize()?;

        Ok(bot_config)
    }

    /// Fail fast on settings the bot cannot run without
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.telegram.token.trim().is_empty() {
            anyhow::bail!("Telegram token is not set. Set BOT_TOKEN environment variable.");
        }
        if self.database.url.trim().is_empty() {
            anyhow::bail!("Database URL is not set. Set DATABASE_URL environment variable.");
        }
        if self.telegram.poll_timeout_secs == 0 {
            tracing::warn!("Telegram poll timeout is 0, falling back to short polling");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.pipeline.max_tokens, 200);
        assert!(config.pipeline.read_only_guard);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let source = r#"
            [telegram]
            token = "123:abc"

            [database]
            url = "postgresql+asyncpg://user:pw@db:5432/videos"

            [llm]
            provider = "gigachat"

            [llm.gigachat]
            credentials = "Y2xpZW50OnNlY3JldA=="
            verify_ssl_certs = false

            [pipeline]
            question_timeout_secs = 0
        "#;
        let config: BotConfig = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.telegram.token, "123:abc");
        assert_eq!(config.telegram.retry_backoff_secs, 3);
        assert_eq!(
            config.database.connect_url(),
            "postgresql://user:pw@db:5432/videos"
        );
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.llm.provider, "gigachat");
        assert_eq!(config.llm.gigachat.verify_ssl_certs, Some(false));
        assert_eq!(config.pipeline.question_timeout_secs, 0);
        assert_eq!(config.pipeline.max_tokens, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_token_rejected() {
        let config = BotConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }
}
