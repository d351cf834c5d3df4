//! Database configuration

use serde::{Deserialize, Serialize};

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Maximum PostgreSQL connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum PostgreSQL connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// Server-side limit for a single generated query, in seconds
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
    /// Run migrations on startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            statement_timeout_secs: default_statement_timeout(),
            run_migrations: true,
        }
    }
}

fn default_url() -> String {
    "postgresql://localhost/vidquery".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_statement_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

impl DatabaseConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Connection URL in the form sqlx understands.
    ///
    /// SQLAlchemy-style driver suffixes (`postgresql+asyncpg://`) are dropped.
    pub fn connect_url(&self) -> String {
        normalize_url(&self.url)
    }

    /// Mask sensitive parts of the PostgreSQL URL for logging
    pub fn url_masked(&self) -> String {
        mask_url(&self.connect_url())
    }
}

fn normalize_url(url: &str) -> String {
    match url.find("://") {
        Some(scheme_end) => {
            let scheme = &url[..scheme_end];
            match scheme.find('+') {
                Some(plus) => format!("{}{}", &scheme[..plus], &url[scheme_end..]),
                None => url.to_string(),
            }
        }
        None => url.to_string(),
    }
}

fn mask_url(url: &str) -> String {
    // Simple masking: replace password with ***
    if let Some(at_pos) = url.rfind('@') {
        if let Some(scheme_end) = url.find("://") {
            if at_pos > scheme_end {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];

                let user_pass = &url[scheme_end + 3..at_pos];
                if let Some(colon_pos) = user_pass.find(':') {
                    let user = &user_pass[..colon_pos];
                    return format!("{}{}:***{}", scheme, user, after_at);
                }
            }
        }
    }
    url.to_string()
}
