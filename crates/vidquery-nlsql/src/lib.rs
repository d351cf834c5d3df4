//! VidQuery NL-to-SQL
//!
//! Turns a Russian analytics question into one SQL aggregate, runs it and
//! renders the scalar as reply text.
//!
//! - [`prompt`]: fixed schema instruction plus the question
//! - [`sanitize`]: strips fences, labels and trailing statements from model output
//! - [`guard`]: rejects anything that is not a single read-only query
//! - [`pipeline`]: wires it together behind [`QueryPipeline::answer`]

pub mod error;
pub mod guard;
pub mod pipeline;
pub mod prompt;
pub mod sanitize;

pub use error::{PipelineError, Result};
pub use guard::{GuardConfig, GuardError, SqlGuard};
pub use pipeline::{
    PipelineConfig, QueryExecutor, QueryPipeline, APOLOGY_REPLY, EMPTY_QUESTION_REPLY,
};
pub use prompt::{build_messages, SCHEMA_DESCRIPTION};
pub use sanitize::{is_canonical_uuid, sanitize_sql};
