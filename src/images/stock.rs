//! Stock photos from Unsplash.
//!
//! The article theme is usually Japanese, so the model first turns it into a
//! handful of English search keywords. A random qualifier and a time-based
//! signature keep consecutive runs from getting the same photo.

use super::{StockPhotoService, download_bytes, write_temp};
use crate::api::{Completion, CompletionRequest};
use crate::config::GenerationSettings;
use crate::error::SourceError;
use crate::models::ImageArtifact;
use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const ENDPOINT: &str = "https://api.unsplash.com/photos/random";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

pub const FALLBACK_KEYWORDS: &str = "artificial intelligence technology future";

const QUALIFIERS: &[&str] = &["technology", "future", "digital", "cyber", "network", "data", "code"];

const KEYWORD_SYSTEM_PROMPT: &str = "You are an expert at finding the perfect stock photos for tech articles.";

fn keyword_prompt(theme: &str) -> String {
    format!(
        "Based on the following article theme/title, generate 3-5 specific English keywords for searching high-quality stock photos (Unsplash).
Theme: {theme}

Requirements:
- Keywords should be in English
- Specific and relevant to the topic
- Suitable for finding professional, modern technology images
- Return ONLY the keywords separated by spaces (no punctuation, no explanations)
- Example output: artificial intelligence robot future technology blue"
    )
}

/// English search keywords for `theme`, or [`FALLBACK_KEYWORDS`] if the model fails.
pub async fn keywords<C: Completion>(completion: &C, settings: &GenerationSettings, theme: &str) -> String {
    let user = keyword_prompt(theme);
    let request = CompletionRequest {
        system: KEYWORD_SYSTEM_PROMPT,
        user: &user,
        temperature: settings.keyword_temperature,
        max_tokens: settings.keyword_max_tokens,
    };

    match completion.complete(&request).await {
        Ok(text) => {
            let keywords = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if keywords.is_empty() {
                FALLBACK_KEYWORDS.to_string()
            } else {
                debug!(%keywords, "Generated image keywords");
                keywords
            }
        }
        Err(e) => {
            warn!(error = %e, "Keyword generation failed; using fallback keywords");
            FALLBACK_KEYWORDS.to_string()
        }
    }
}

/// Append one random qualifier for variety.
pub fn with_qualifier<R: Rng + ?Sized>(keywords: &str, rng: &mut R) -> String {
    match QUALIFIERS.choose(rng) {
        Some(q) => format!("{keywords} {q}"),
        None => keywords.to_string(),
    }
}

/// Cache-busting signature derived from the wall clock.
pub fn signature() -> u32 {
    (Utc::now().timestamp_millis().rem_euclid(10_000)) as u32
}

#[instrument(level = "info", skip_all)]
pub async fn fetch<C, S>(
    completion: &C,
    service: &S,
    settings: &GenerationSettings,
    theme: &str,
) -> Option<ImageArtifact>
where
    C: Completion,
    S: StockPhotoService,
{
    if !service.available() {
        warn!("UNSPLASH_ACCESS_KEY is not set; skipping stock photos");
        return None;
    }

    let keywords = keywords(completion, settings, theme).await;
    let query = with_qualifier(&keywords, &mut rand::rng());
    info!(%query, "Searching stock photos");

    let result: Result<ImageArtifact, SourceError> = async {
        let url = service.search(&query, signature()).await?;
        debug!(%url, "Downloading stock photo");
        let bytes = service.download(&url).await?;
        let local_path = write_temp(&bytes, ".jpg").await?;
        Ok(ImageArtifact {
            source_url: url,
            local_path,
        })
    }
    .await;

    match result {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            warn!(error = %e, "Stock photo unavailable");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct RandomPhoto {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

/// Unsplash API client.
#[derive(Debug, Clone)]
pub struct UnsplashClient {
    http: reqwest::Client,
    access_key: Option<String>,
}

impl UnsplashClient {
    pub fn new(http: reqwest::Client, access_key: Option<String>) -> Self {
        Self { http, access_key }
    }
}

impl StockPhotoService for UnsplashClient {
    fn available(&self) -> bool {
        self.access_key.is_some()
    }

    async fn search(&self, query: &str, signature: u32) -> Result<String, SourceError> {
        let key = self
            .access_key
            .as_deref()
            .ok_or(SourceError::MissingCredential("UNSPLASH_ACCESS_KEY"))?;
        let response = self
            .http
            .get(ENDPOINT)
            .query(&[
                ("query", query.to_string()),
                ("orientation", "landscape".to_string()),
                ("content_filter", "high".to_string()),
                ("sig", signature.to_string()),
            ])
            .header("Authorization", format!("Client-ID {key}"))
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }
        let photo: RandomPhoto = response.json().await?;
        Ok(photo.urls.regular)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        download_bytes(&self.http, url).await
    }
}
