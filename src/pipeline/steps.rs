//! The four generation steps
//!
//! Every step is composed the same way, outermost first:
//! cache check (discovery and selection only), retry policy, worker pool,
//! backend call. A cache hit therefore skips retries and the pool entirely.

use super::types::{validate_count, CaptionLength, CaptionResult, Formality, Selection, Theme};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::generation::response::{parse_caption, parse_selection, parse_subtopics};
use crate::generation::{
    CacheKey, Generation, GenerationClient, PromptEngine, ResponseCache, RetryPolicy, WorkerPool,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const SUBTOPICS_STEP: &str = "subtopics";
pub const SELECTION_STEP: &str = "selection";
pub const CAPTION_STEP: &str = "caption";
pub const IMAGE_PROMPT_STEP: &str = "image_prompt";

/// Step implementations sharing one backend, cache and worker pool
pub struct PipelineSteps {
    client: Arc<dyn GenerationClient>,
    cache: Arc<ResponseCache>,
    pool: WorkerPool,
    retry: RetryPolicy,
    prompts: PromptEngine,
    model: String,
}

impl PipelineSteps {
    /// Assemble steps from explicitly shared services
    pub fn new(
        client: Arc<dyn GenerationClient>,
        cache: Arc<ResponseCache>,
        pool: WorkerPool,
        config: &PipelineConfig,
    ) -> Result<Self> {
        Ok(Self {
            client,
            cache,
            pool,
            retry: RetryPolicy::from_settings(&config.retry),
            prompts: PromptEngine::new(config.content.clone())?,
            model: config.backend.model.clone(),
        })
    }

    /// Build fresh cache and pool instances from configuration
    pub fn from_config(client: Arc<dyn GenerationClient>, config: &PipelineConfig) -> Result<Self> {
        let cache = Arc::new(ResponseCache::from_config(&config.cache)?);
        let pool = WorkerPool::new(config.workers)?;
        Self::new(client, cache, pool, config)
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Ask the backend for up to `count` subtopics of `theme`
    #[instrument(skip(self, theme), fields(theme = %theme))]
    pub async fn discover_subtopics(&self, theme: &Theme, count: usize) -> Result<Vec<String>> {
        let count = validate_count(count)?;
        let key = CacheKey::new(SUBTOPICS_STEP, &(theme.as_str(), count))?;

        self.cached(&key, |items: &Vec<String>| !items.is_empty(), || async move {
            let prompt = self.prompts.subtopics(theme.as_str(), count)?;
            let raw = self.call_backend(SUBTOPICS_STEP, prompt).await?;
            let items = parse_subtopics(&raw, count);
            debug!(requested = count, received = items.len(), "Parsed subtopics");
            Ok(items)
        })
        .await
    }

    /// Let the backend pick the most relevant subtopic
    #[instrument(skip(self, theme, subtopics), fields(theme = %theme, candidates = subtopics.len()))]
    pub async fn select_subtopic(&self, theme: &Theme, subtopics: &[String]) -> Result<Selection> {
        if subtopics.is_empty() {
            return Err(Error::Validation(
                "There are no subtopics to choose from".to_string(),
            ));
        }
        let key = CacheKey::new(SELECTION_STEP, &(theme.as_str(), subtopics))?;

        self.cached(&key, |_: &Selection| true, || async move {
            let prompt = self.prompts.selection(theme.as_str(), subtopics)?;
            let raw = self.call_backend(SELECTION_STEP, prompt).await?;
            Ok(parse_selection(&raw, subtopics))
        })
        .await
    }

    /// Write a caption for `subtopic`; always a fresh backend call
    #[instrument(skip(self))]
    pub async fn generate_caption(
        &self,
        subtopic: &str,
        length: CaptionLength,
        formality: Formality,
    ) -> Result<CaptionResult> {
        let subtopic = required_subtopic(subtopic)?;
        let prompt = self
            .prompts
            .caption(subtopic, length.describe(), formality.describe())?;
        let raw = self.call_backend(CAPTION_STEP, prompt).await?;
        Ok(parse_caption(&raw))
    }

    /// Produce one image-generation prompt for `subtopic`, verbatim
    #[instrument(skip(self))]
    pub async fn generate_image_prompt(&self, subtopic: &str) -> Result<String> {
        let subtopic = required_subtopic(subtopic)?;
        let prompt = self.prompts.image_prompt(subtopic)?;
        self.call_backend(IMAGE_PROMPT_STEP, prompt).await
    }

    /// Return a cached value or compute, store and return it.
    ///
    /// Errors are never stored; neither are values `cacheable` rejects.
    async fn cached<T, P, F, Fut>(&self, key: &CacheKey, cacheable: P, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        P: FnOnce(&T) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.cache.get_as::<T>(key).await {
            return Ok(hit);
        }

        let value = compute().await?;
        if cacheable(&value) {
            self.cache.put_as(key, &value).await?;
        }
        Ok(value)
    }

    /// Retry-wrapped, pool-isolated backend call returning the raw text
    async fn call_backend(&self, step: &'static str, prompt: String) -> Result<String> {
        let payload_size = prompt.len();
        let prompt: Arc<str> = Arc::from(prompt);

        self.retry
            .execute(step, payload_size, || {
                let client = Arc::clone(&self.client);
                let model = self.model.clone();
                let prompt = Arc::clone(&prompt);
                let pool = self.pool.clone();
                async move {
                    pool.run(move || {
                        client
                            .generate(&model, &prompt)
                            .map(Generation::into_text)
                    })
                    .await
                }
            })
            .await
    }
}

fn required_subtopic(subtopic: &str) -> Result<&str> {
    let trimmed = subtopic.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Subtopic must not be empty".to_string()));
    }
    Ok(trimmed)
}
