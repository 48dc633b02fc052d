//! Testing utilities and fixtures
//!
//! A scripted generation backend plus builders for the scenarios the
//! pipeline tests keep reaching for.

use crate::error::{Error, Result};
use crate::generation::{Generation, GenerationClient};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// One scripted backend reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Text(String),
    /// Backend answered without any text
    Empty,
    /// Backend call failed with this message
    Fail(String),
}

impl MockReply {
    fn into_result(self) -> Result<Generation> {
        match self {
            MockReply::Text(text) => Ok(Generation::new(text)),
            MockReply::Empty => Ok(Generation::empty()),
            MockReply::Fail(message) => Err(Error::Backend(message)),
        }
    }
}

/// A recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
}

/// Generation backend answering from a script
///
/// Replies are consumed in order; once the script runs out the fallback
/// reply (if any) is repeated, otherwise calls fail.
#[derive(Debug, Default)]
pub struct MockGenerationClient {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Option<MockReply>,
    latency: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub fn push_text(&self, text: &str) {
        self.push_reply(MockReply::Text(text.to_string()));
    }

    pub fn push_failure(&self, message: &str) {
        self.push_reply(MockReply::Fail(message.to_string()));
    }

    /// Number of backend calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Prompts sent so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.prompt).collect()
    }
}

impl GenerationClient for MockGenerationClient {
    fn generate(&self, model_id: &str, prompt: &str) -> Result<Generation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                model: model_id.to_string(),
                prompt: prompt.to_string(),
            });

        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(reply) => reply.into_result(),
            None => Err(Error::Backend("No mock response configured".to_string())),
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// Builder for creating mock generation backends with predefined replies
#[derive(Default)]
pub struct MockGenerationBuilder {
    mock: MockGenerationClient,
}

impl MockGenerationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, text: &str) -> Self {
        self.mock.push_text(text);
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.mock.push_failure(message);
        self
    }

    pub fn with_empty(self) -> Self {
        self.mock.push_reply(MockReply::Empty);
        self
    }

    /// Reply repeated once the script is exhausted
    pub fn otherwise(mut self, reply: MockReply) -> Self {
        self.mock.fallback = Some(reply);
        self
    }

    /// Block each call for `latency`, like a slow network backend
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.mock.latency = Some(latency);
        self
    }

    pub fn build(self) -> MockGenerationClient {
        self.mock
    }
}

/// Test fixture for common scenarios
pub struct TestFixtures;

impl TestFixtures {
    /// Five numbered subtopics about sustainability
    pub const SUSTAINABILITY_SUBTOPICS: &'static str = "\
1. Reciclagem criativa
2. Moda sustentável
3. Energia solar em casa
4. Consumo consciente
5. Hortas urbanas";

    /// Backend answering a whole run: subtopics, selection, caption, image prompt
    pub fn sustainability_backend() -> MockGenerationClient {
        MockGenerationBuilder::new()
            .with_text(Self::SUSTAINABILITY_SUBTOPICS)
            .with_text(r#"{"choice": "Moda sustentável", "reason": "Tema em alta entre jovens"}"#)
            .with_text(
                r##"{"caption": "Seu guarda-roupa pode salvar o planeta 🌍👗", "hashtags": ["#modasustentavel", "#ecofriendly"], "cta": "Conta nos comentários qual peça você reaproveitaria!"}"##,
            )
            .with_text("A sunlit thrift-store flat lay of upcycled denim, soft film grain, warm tones")
            .build()
    }

    /// Backend whose every call fails
    pub fn unavailable_backend() -> MockGenerationClient {
        MockGenerationBuilder::new()
            .otherwise(MockReply::Fail("Service unavailable".to_string()))
            .build()
    }
}
