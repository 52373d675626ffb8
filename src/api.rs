//! Language-model completion service.
//!
//! # Architecture
//!
//! - [`Completion`]: the trait every component talks to
//! - [`CompletionRequest`]: system prompt, user prompt and sampling limits
//! - [`OpenAiClient`]: `Completion` over an OpenAI-compatible
//!   `/chat/completions` endpoint
//!
//! There is no automatic retry at this layer. A failed completion surfaces as
//! a [`CompletionError`] and the caller decides whether that ends the run.

use crate::error::CompletionError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// One completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for text completion.
///
/// Implementors must handle both short (tens of tokens) and long (thousands
/// of tokens) generations.
pub trait Completion {
    /// Send the prompts and return the trimmed response text.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Authorization and content-type headers for any endpoint of this API.
    pub fn headers(&self) -> Result<HeaderMap, CompletionError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| CompletionError::Auth(format!("API key is not a valid header value: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl Completion for OpenAiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model, max_tokens = request.max_tokens))]
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = CompletionError::from_status(status, text);
            warn!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                %status,
                error = %err,
                "Completion request failed"
            );
            return Err(err);
        }

        let parsed: ChatResponse = response.json().await?;
        let text = extract_content(parsed)?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            "Completion succeeded"
        );
        Ok(text)
    }
}

fn extract_content(response: ChatResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(CompletionError::Empty)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted completion stub shared by the component tests.

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub system: String,
        pub user: String,
        pub max_tokens: u32,
    }

    /// Replies with queued responses in order; an exhausted queue yields
    /// [`CompletionError::Empty`].
    #[derive(Debug, Default)]
    pub struct ScriptedCompletion {
        replies: RefCell<VecDeque<Result<String, CompletionError>>>,
        pub calls: RefCell<Vec<RecordedCall>>,
    }

    impl ScriptedCompletion {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: RefCell::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn failing(err: CompletionError) -> Self {
            Self {
                replies: RefCell::new(VecDeque::from([Err(err)])),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Completion for ScriptedCompletion {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError> {
            self.calls.borrow_mut().push(RecordedCall {
                system: request.system.to_string(),
                user: request.user.to_string(),
                max_tokens: request.max_tokens,
            });
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(CompletionError::Empty))
        }
    }
}
