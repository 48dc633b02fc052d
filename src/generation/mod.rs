//! Generation layer
//!
//! Everything between a pipeline step and the text-completion backend:
//! the backend abstraction, the shared response cache, the retry policy,
//! the blocking worker pool, prompt templates and response parsers.

pub mod cache;
pub mod gemini;
pub mod isolator;
pub mod prompt;
pub mod response;
pub mod retry;

pub use cache::{CacheKey, ResponseCache};
pub use gemini::GeminiClient;
pub use isolator::WorkerPool;
pub use prompt::PromptEngine;
pub use retry::RetryPolicy;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Raw output of a single backend call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    /// Generated text; backends may legitimately return none.
    pub text: Option<String>,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }

    /// The generated text, treating an absent body as the empty string
    pub fn into_text(self) -> String {
        self.text.unwrap_or_default()
    }
}

/// Text-completion backend used by every pipeline step
///
/// Implementations may block (network I/O); callers dispatch them through
/// [`WorkerPool`] so the control loop never blocks on a call.
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for `prompt` with the given model
    fn generate(&self, model_id: &str, prompt: &str) -> Result<Generation>;

    /// Backend name for logging
    fn provider_name(&self) -> &str;
}
