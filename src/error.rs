//! Error types for the pipeline.
//!
//! Failures are split by how far they are allowed to travel:
//!
//! - [`ConfigError`]: fatal at startup, surfaced before any network call.
//! - [`CompletionError`]: the language model is the one collaborator the
//!   article cannot be written without, so these propagate to the caller.
//! - [`SourceError`]: optional data sources (news, images). These are caught
//!   at the point of use and turned into "no result" by the fallback chains.
//! - [`PipelineError`]: what a single run reports back to `main`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("API key does not look like an OpenAI key (starts with '{preview}...')")]
    InvalidApiKey { preview: String },

    #[error("failed to read settings file {path}: {source}")]
    SettingsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    SettingsParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Coarse failure category used for the user-facing diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Authentication,
    Quota,
    Network,
    Other,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service rejected the credential: {0}")]
    Auth(String),

    #[error("completion service quota exhausted or rate limited: {0}")]
    Quota(String),

    #[error("completion service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned no content")]
    Empty,
}

impl CompletionError {
    /// Classify an unsuccessful HTTP response from an OpenAI-compatible API.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED
            || body.contains("invalid_api_key")
            || body.contains("Incorrect API key")
        {
            CompletionError::Auth(body)
        } else if status == StatusCode::TOO_MANY_REQUESTS || body.contains("insufficient_quota") {
            CompletionError::Quota(body)
        } else {
            CompletionError::Status { status, body }
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            CompletionError::Auth(_) => FailureCategory::Authentication,
            CompletionError::Quota(_) => FailureCategory::Quota,
            CompletionError::Transport(e) if e.is_timeout() || e.is_connect() => {
                FailureCategory::Network
            }
            CompletionError::Status { status, .. } if status.is_server_error() => {
                FailureCategory::Network
            }
            _ => FailureCategory::Other,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} credential is not configured")]
    MissingCredential(&'static str),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    #[error("failed to decode inline image: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("article generation failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("failed to set up HTTP client: {0}")]
    Client(#[from] SourceError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl PipelineError {
    pub fn category(&self) -> FailureCategory {
        match self {
            PipelineError::Completion(e) => e.category(),
            _ => FailureCategory::Other,
        }
    }

    /// Human-readable explanation with remediation hints for the two most
    /// common causes of a failed run.
    pub fn diagnostic(&self) -> String {
        match self.category() {
            FailureCategory::Authentication => format!(
                "Authentication with the completion service failed ({self}).\n\
                 - Check that OPENAI_API_KEY was copied without extra spaces or newlines.\n\
                 - The key may have been revoked; create a new one at https://platform.openai.com/api-keys"
            ),
            FailureCategory::Quota => format!(
                "The completion service quota is exhausted or rate limited ({self}).\n\
                 - Check billing at https://platform.openai.com/account/billing\n\
                 - Project-scoped keys (sk-proj-...) are limited by the project quota; raise it or use another key.\n\
                 - Organization-level limits apply as well."
            ),
            FailureCategory::Network => {
                format!("A transient network failure interrupted the run ({self}). The next run may succeed.")
            }
            FailureCategory::Other => format!("The run failed: {self}"),
        }
    }
}
