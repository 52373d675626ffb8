//! Fast generative images via Banana.
//!
//! A job is submitted, then polled once per interval until it reports
//! finished or the wall-clock budget runs out. A finished job carries either
//! an inline base64 image or a URL to download.

use super::{FastImageParams, FastImageService, JobOutput, JobStatus, download_bytes, write_temp};
use crate::config::ImageSettings;
use crate::error::SourceError;
use crate::models::ImageArtifact;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, instrument, warn};

const START_ENDPOINT: &str = "https://api.banana.dev/start/v4";
const CHECK_ENDPOINT: &str = "https://api.banana.dev/check/v4";
const MODEL_KEY: &str = "flux-nano";
const START_TIMEOUT: Duration = Duration::from_secs(30);
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub fn prompt(theme: &str) -> String {
    format!(
        "Professional tech blog header image about {theme}. \
Modern, clean design with AI and technology theme. \
Futuristic, high quality, 4K, professional photography style. \
Colors: blues, purples, tech gradients. No text."
    )
}

/// Turn a finished job's output into a local image.
async fn materialize<S: FastImageService>(
    service: &S,
    output: Option<&JobOutput>,
) -> Result<ImageArtifact, SourceError> {
    let output = output.ok_or_else(|| SourceError::Malformed("finished job has no outputs".into()))?;

    if let Some(encoded) = output.image_base64.as_deref().filter(|s| !s.is_empty()) {
        let bytes = STANDARD.decode(encoded.trim())?;
        let local_path = write_temp(&bytes, ".jpg").await?;
        return Ok(ImageArtifact {
            source_url: format!("file://{}", local_path.display()),
            local_path,
        });
    }

    if let Some(url) = output.image_url.as_deref().filter(|s| !s.is_empty()) {
        let bytes = service.download(url).await?;
        let local_path = write_temp(&bytes, ".jpg").await?;
        return Ok(ImageArtifact {
            source_url: url.to_string(),
            local_path,
        });
    }

    Err(SourceError::Malformed(
        "finished job has neither image_base64 nor image_url".into(),
    ))
}

/// Submit and poll one job. `Ok(None)` means the budget ran out.
///
/// Status requests and the waits between them are cut short at the budget.
async fn run_job<S: FastImageService>(
    service: &S,
    settings: &ImageSettings,
    prompt: &str,
) -> Result<Option<ImageArtifact>, SourceError> {
    let job_id = service.submit(prompt, &FastImageParams::default()).await?;
    info!(%job_id, "Image job submitted");

    let started = Instant::now();
    let budget = settings.poll_budget();
    let remaining = || budget.saturating_sub(started.elapsed());
    while !remaining().is_zero() {
        let status: JobStatus = match timeout(remaining(), service.poll(&job_id)).await {
            Ok(status) => status?,
            Err(_) => break,
        };
        if status.finished {
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Image job finished");
            let first = status.outputs.as_deref().and_then(<[JobOutput]>::first);
            return materialize(service, first).await.map(Some);
        }
        sleep(settings.poll_interval().min(remaining())).await;
    }
    Ok(None)
}

#[instrument(level = "info", skip_all)]
pub async fn fetch<S: FastImageService>(
    service: &S,
    settings: &ImageSettings,
    theme: &str,
) -> Option<ImageArtifact> {
    if !service.available() {
        warn!("BANANA_API_KEY is not set; skipping fast image generation");
        return None;
    }

    let prompt = prompt(theme);
    debug!(prompt = %crate::utils::truncate_for_log(&prompt, 100), "Generating image");

    match run_job(service, settings, &prompt).await {
        Ok(Some(artifact)) => Some(artifact),
        Ok(None) => {
            warn!(budget_secs = settings.poll_budget_secs, "Image job timed out");
            None
        }
        Err(e) => {
            warn!(error = %e, "Fast image generation failed");
            None
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest<'a> {
    api_key: &'a str,
    model_key: &'a str,
    model_inputs: ModelInputs<'a>,
}

#[derive(Debug, Serialize)]
struct ModelInputs<'a> {
    prompt: &'a str,
    #[serde(flatten)]
    params: &'a FastImageParams,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    #[serde(default, rename = "callID")]
    call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    #[serde(rename = "callID")]
    call_id: &'a str,
}

/// Banana job API client.
#[derive(Debug, Clone)]
pub struct BananaClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl BananaClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    fn key(&self) -> Result<&str, SourceError> {
        self.api_key
            .as_deref()
            .ok_or(SourceError::MissingCredential("BANANA_API_KEY"))
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, SourceError> {
        let response = self.http.post(url).json(body).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }
        Ok(response.json().await?)
    }
}

impl FastImageService for BananaClient {
    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn submit(&self, prompt: &str, params: &FastImageParams) -> Result<String, SourceError> {
        let request = StartRequest {
            api_key: self.key()?,
            model_key: MODEL_KEY,
            model_inputs: ModelInputs { prompt, params },
        };
        let response: StartResponse = self.post_json(START_ENDPOINT, &request, START_TIMEOUT).await?;
        response
            .call_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SourceError::Malformed("start response has no callID".into()))
    }

    async fn poll(&self, job_id: &str) -> Result<JobStatus, SourceError> {
        let request = CheckRequest {
            api_key: self.key()?,
            call_id: job_id,
        };
        self.post_json(CHECK_ENDPOINT, &request, CHECK_TIMEOUT).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        download_bytes(&self.http, url).await
    }
}
