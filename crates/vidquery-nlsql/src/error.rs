//! Pipeline error types

use thiserror::Error;
use vidquery_db::DbError;
use vidquery_llm::LLMError;

use crate::guard::GuardError;

/// Errors that can occur while answering one question
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Empty question")]
    EmptyQuestion,

    #[error("Translation failed: {0}")]
    Translation(#[from] LLMError),

    #[error("Statement rejected: {0}")]
    Rejected(#[from] GuardError),

    #[error("Execution failed: {0}")]
    Execution(#[from] DbError),

    #[error("Question timed out after {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
