//! Question answering pipeline
//!
//! `build_messages → LLMRouter::complete → sanitize_sql → SqlGuard::check →
//! QueryExecutor::fetch_scalar → render_scalar`
//!
//! [`QueryPipeline::answer`] is the error boundary: whatever goes wrong, the
//! caller gets a reply string and the detail goes to the log.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use vidquery_db::{render_scalar, Database, DbResult, ScalarValue};
use vidquery_llm::{CompletionRequest, LLMRouter};

use crate::error::{PipelineError, Result};
use crate::guard::SqlGuard;
use crate::prompt::build_messages;
use crate::sanitize::sanitize_sql;

/// Reply sent when anything fails after the question was accepted
pub const APOLOGY_REPLY: &str =
    "Ошибка при обработке запроса.\nПопробуй переформулировать вопрос (или проверь, что данные загружены).";

/// Reply sent for blank input
pub const EMPTY_QUESTION_REPLY: &str = "Пустой запрос. Напиши вопрос текстом.";

/// Runs a single SQL statement and returns its scalar
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_scalar(&self, sql: &str) -> DbResult<Option<ScalarValue>>;
}

#[async_trait]
impl QueryExecutor for Database {
    async fn fetch_scalar(&self, sql: &str) -> DbResult<Option<ScalarValue>> {
        Database::fetch_scalar(self, sql).await
    }
}

/// Pipeline tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// End-to-end limit per question in seconds, `0` disables it
    #[serde(default = "default_question_timeout")]
    pub question_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub read_only_guard: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            question_timeout_secs: default_question_timeout(),
            read_only_guard: true,
        }
    }
}

fn default_max_tokens() -> u32 {
    200
}

fn default_question_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Natural-language question to scalar answer
pub struct QueryPipeline {
    llm: LLMRouter,
    executor: Arc<dyn QueryExecutor>,
    guard: Option<SqlGuard>,
    config: PipelineConfig,
}

impl QueryPipeline {
    pub fn new(llm: LLMRouter, executor: Arc<dyn QueryExecutor>, config: PipelineConfig) -> Self {
        let guard = config.read_only_guard.then(SqlGuard::new);
        Self {
            llm,
            executor,
            guard,
            config,
        }
    }

    /// Ask the model for SQL and sanitize it.
    pub async fn translate(&self, question: &str) -> Result<String> {
        let request = CompletionRequest::new(build_messages(question))
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm.complete(request).await?;
        debug!(raw = %response.content, "Model output");

        let sql = sanitize_sql(&response.content);
        info!(provider = %self.llm.kind(), sql = %sql, "Generated SQL");
        Ok(sql)
    }

    async fn run_inner(&self, question: &str) -> Result<Option<ScalarValue>> {
        let sql = self.translate(question).await?;

        if let Some(guard) = &self.guard {
            guard.check(&sql)?;
        }

        Ok(self.executor.fetch_scalar(&sql).await?)
    }

    /// Translate and execute one question, under the configured timeout.
    pub async fn run(&self, question: &str) -> Result<Option<ScalarValue>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        match self.config.question_timeout_secs {
            0 => self.run_inner(question).await,
            secs => tokio::time::timeout(Duration::from_secs(secs), self.run_inner(question))
                .await
                .map_err(|_| PipelineError::Timeout(secs))?,
        }
    }

    /// Reply text for one question. Never fails.
    pub async fn answer(&self, question: &str) -> String {
        match self.run(question).await {
            Ok(value) => render_scalar(value.as_ref()),
            Err(PipelineError::EmptyQuestion) => EMPTY_QUESTION_REPLY.to_string(),
            Err(e) => {
                error!(question = %question.trim(), error = %e, "Failed to answer question");
                APOLOGY_REPLY.to_string()
            }
        }
    }
}
