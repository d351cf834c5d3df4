//! VidQuery LLM - provider abstraction for natural-language-to-SQL translation
//!
//! Two interchangeable cloud providers sit behind one trait:
//!
//! - OpenAI (chat completions API)
//! - GigaChat (Sber, OAuth token exchange + OpenAI-shaped chat API)
//!
//! The provider is selected once at startup from configuration. Calls are
//! never retried or cached here; every question reaches the provider.

pub mod providers;
pub mod router;
pub mod types;

pub use providers::*;
pub use router::*;
pub use types::*;
