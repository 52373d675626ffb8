//! Header image sourcing.
//!
//! # Sources
//!
//! | Selector | Module | Service |
//! |----------|--------|---------|
//! | `generative-fast` (`banana`, `nano`) | [`fast`] | submit/poll text-to-image job |
//! | `stock` (`unsplash`) | [`stock`] | random photo search by keywords |
//! | `generative-standard` (`dalle`) | [`standard`] | synchronous text-to-image |
//!
//! # Fallbacks
//!
//! - generative-fast falls back to stock (on by default), and no further
//! - stock falls back to generative-standard only when enabled
//! - generative-standard has no fallback
//!
//! Images are optional. Every failure, including an unknown selector, is
//! logged and ends in `None`. A returned [`ImageArtifact`] is a temporary file
//! owned by the caller.

pub mod fast;
pub mod standard;
pub mod stock;

use crate::api::Completion;
use crate::config::GenerationSettings;
use crate::error::SourceError;
use crate::fallback::{Strategy, first_success};
use crate::models::ImageArtifact;
use futures::FutureExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Fast,
    Stock,
    Standard,
}

impl ImageSource {
    /// Parse a selector, accepting the service names as aliases.
    pub fn parse(selector: &str) -> Option<Self> {
        match selector.trim().to_lowercase().as_str() {
            "generative-fast" | "banana" | "nano" => Some(ImageSource::Fast),
            "stock" | "unsplash" => Some(ImageSource::Stock),
            "generative-standard" | "dalle" => Some(ImageSource::Standard),
            _ => None,
        }
    }

    /// Canonical selector name.
    pub fn name(self) -> &'static str {
        match self {
            ImageSource::Fast => "generative-fast",
            ImageSource::Stock => "stock",
            ImageSource::Standard => "generative-standard",
        }
    }
}

/// Sources to try, in order, for a primary selection.
///
/// Fallbacks do not chain: a fast-generator failure falls back to stock
/// photos and stops there.
pub fn plan(primary: ImageSource, fast_to_stock: bool, stock_to_standard: bool) -> Vec<ImageSource> {
    let mut order = vec![primary];
    match primary {
        ImageSource::Fast if fast_to_stock => order.push(ImageSource::Stock),
        ImageSource::Stock if stock_to_standard => order.push(ImageSource::Standard),
        _ => {}
    }
    order
}

/// Stock photo search.
pub trait StockPhotoService {
    /// Whether credentials are present; unconfigured services are skipped.
    fn available(&self) -> bool {
        true
    }

    /// URL of one landscape photo matching `query`. `signature` busts caches.
    async fn search(&self, query: &str, signature: u32) -> Result<String, SourceError>;

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// Image model inputs for the fast generator.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FastImageParams {
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
}

impl Default for FastImageParams {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 576,
            num_inference_steps: 4,
            guidance_scale: 3.5,
        }
    }
}

/// Result of polling a fast generation job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub finished: bool,
    #[serde(default, rename = "modelOutputs")]
    pub outputs: Option<Vec<JobOutput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobOutput {
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Asynchronous text-to-image job service.
pub trait FastImageService {
    fn available(&self) -> bool {
        true
    }

    /// Start a job and return its id.
    async fn submit(&self, prompt: &str, params: &FastImageParams) -> Result<String, SourceError>;

    async fn poll(&self, job_id: &str) -> Result<JobStatus, SourceError>;

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// Synchronous text-to-image service.
pub trait StandardImageService {
    /// Generate one image and return its URL.
    async fn generate(&self, prompt: &str, size: &str, quality: &str) -> Result<String, SourceError>;

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// Write image bytes to a temporary file that outlives this process.
pub async fn write_temp(bytes: &[u8], suffix: &str) -> Result<PathBuf, SourceError> {
    let file = tempfile::Builder::new()
        .prefix("ai_post_image_")
        .suffix(suffix)
        .tempfile()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    tokio::fs::write(&path, bytes).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote image to temporary file");
    Ok(path)
}

/// GET `url` and return the body.
pub async fn download_bytes(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, SourceError> {
    let response = http.get(url).timeout(DOWNLOAD_TIMEOUT).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            status,
            body: crate::utils::truncate_for_log(&body, 200),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

pub struct ImageSourcer<'a, C, S, F, G> {
    completion: &'a C,
    stock: &'a S,
    fast: &'a F,
    standard: &'a G,
    settings: &'a GenerationSettings,
    stock_to_standard: bool,
}

impl<'a, C, S, F, G> ImageSourcer<'a, C, S, F, G>
where
    C: Completion,
    S: StockPhotoService,
    F: FastImageService,
    G: StandardImageService,
{
    pub fn new(
        completion: &'a C,
        stock: &'a S,
        fast: &'a F,
        standard: &'a G,
        settings: &'a GenerationSettings,
        stock_to_standard: bool,
    ) -> Self {
        Self {
            completion,
            stock,
            fast,
            standard,
            settings,
            stock_to_standard,
        }
    }

    fn strategy<'s>(&'s self, source: ImageSource, theme: &'s str) -> Strategy<'s, ImageArtifact> {
        let attempt = match source {
            ImageSource::Fast => fast::fetch(self.fast, &self.settings.images, theme).boxed_local(),
            ImageSource::Stock => {
                stock::fetch(self.completion, self.stock, self.settings, theme).boxed_local()
            }
            ImageSource::Standard => standard::fetch(self.standard, theme).boxed_local(),
        };
        Strategy::new(source.name(), attempt)
    }

    /// Source a header image for `theme` according to `selector`.
    #[instrument(level = "info", skip_all, fields(selector = %selector))]
    pub async fn fetch(&self, selector: &str, theme: &str) -> Option<ImageArtifact> {
        let Some(primary) = ImageSource::parse(selector) else {
            warn!(%selector, "Unknown image source; continuing without an image");
            return None;
        };

        let order = plan(
            primary,
            self.settings.images.fast_fallback_to_stock,
            self.stock_to_standard,
        );
        debug!(?order, "Image source plan");
        let chain = order.into_iter().map(|s| self.strategy(s, theme)).collect();

        match first_success(chain).await {
            Some((source, artifact)) => {
                info!(source, path = %artifact.local_path.display(), "Header image ready");
                Some(artifact)
            }
            None => {
                warn!("No image source produced an image; continuing without one");
                None
            }
        }
    }
}
