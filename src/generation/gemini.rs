//! Gemini `generateContent` client

use super::{Generation, GenerationClient};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Blocking Gemini client.
///
/// The HTTP client is built on first use, which happens on a worker thread.
pub struct GeminiClient {
    client: OnceCell<Client>,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate, if any
    fn into_generation(self) -> Generation {
        let text = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty());

        Generation { text }
    }
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config(
                "Gemini API key is missing (set GEMINI_API_KEY or backend.api_key)".to_string(),
            ));
        }

        Ok(Self {
            client: OnceCell::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.base_url.clone(),
            config.request_timeout,
        )
    }

    fn http(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))
        })
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model_id)
    }
}

impl GenerationClient for GeminiClient {
    fn generate(&self, model_id: &str, prompt: &str) -> Result<Generation> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = model_id, prompt_chars = prompt.len(), "Calling Gemini");
        let response = self
            .http()?
            .post(self.endpoint(model_id))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| Error::Backend(format!("API request failed: {e}")))?;

        match response.status() {
            StatusCode::OK => {
                let body: GenerateResponse = response
                    .json()
                    .map_err(|e| Error::Backend(format!("Failed to parse response: {e}")))?;
                Ok(body.into_generation())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                Err(Error::Backend("Rate limit exceeded".to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Backend("Invalid API key".to_string()))
            }
            status => {
                let error_text = response.text().unwrap_or_default();
                Err(Error::Backend(format!("API error {status}: {error_text}")))
            }
        }
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
