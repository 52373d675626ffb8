//! Standard generative images from the OpenAI images endpoint.

use super::{StandardImageService, download_bytes, write_temp};
use crate::api::OpenAiClient;
use crate::error::{CompletionError, SourceError};
use crate::models::ImageArtifact;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const SIZE: &str = "1024x1024";
const QUALITY: &str = "standard";

pub fn prompt(theme: &str) -> String {
    format!(
        "Create a professional, modern illustration for an AI technology blog article about: {theme}.
The image should be:
- Clean and minimalist design
- Suitable for a technology blog
- Related to artificial intelligence, AI technology, or digital innovation
- Modern tech colors (blues, purples, gradients)
- Futuristic but approachable
- No text in the image
Style: Modern tech illustration, professional, sleek"
    )
}

#[instrument(level = "info", skip_all)]
pub async fn fetch<S: StandardImageService>(service: &S, theme: &str) -> Option<ImageArtifact> {
    let prompt = prompt(theme);
    let result: Result<ImageArtifact, SourceError> = async {
        let url = service.generate(&prompt, SIZE, QUALITY).await?;
        debug!(%url, "Downloading generated image");
        let bytes = service.download(&url).await?;
        let local_path = write_temp(&bytes, ".png").await?;
        Ok(ImageArtifact {
            source_url: url,
            local_path,
        })
    }
    .await;

    result
        .map_err(|e| warn!(error = %e, "Standard image generation failed"))
        .ok()
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    url: Option<String>,
}

/// Images endpoint of the configured OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct DalleClient<'a> {
    api: &'a OpenAiClient,
    model: String,
}

impl<'a> DalleClient<'a> {
    pub fn new(api: &'a OpenAiClient, model: &str) -> Self {
        Self {
            api,
            model: model.to_string(),
        }
    }
}

impl StandardImageService for DalleClient<'_> {
    async fn generate(&self, prompt: &str, size: &str, quality: &str) -> Result<String, SourceError> {
        let request = GenerationRequest {
            model: &self.model,
            prompt,
            size,
            quality,
            n: 1,
        };
        let response = self
            .api
            .http()
            .post(format!("{}/images/generations", self.api.base_url()))
            .headers(self.api.headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status, body).into());
        }
        let parsed: GenerationResponse = response.json().await?;
        first_url(parsed)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        download_bytes(self.api.http(), url).await
    }
}

fn first_url(response: GenerationResponse) -> Result<String, SourceError> {
    response
        .data
        .into_iter()
        .next()
        .and_then(|image| image.url)
        .ok_or_else(|| SourceError::Malformed("image response has no url".into()))
}
