//! Local output sink for finished articles.
//!
//! # Submodules
//!
//! - [`json`]: the article as JSON, for whatever publishes it next
//! - [`html`]: a standalone HTML page for previewing
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── 093015_gpt-4o-の新機能.json
//!     ├── 093015_gpt-4o-の新機能.html
//!     └── 093015_gpt-4o-の新機能.jpg
//! ```
//!
//! The header image arrives as a temporary file owned by the caller; it is
//! moved next to the article, so no temporary file outlives a successful write.

pub mod html;
pub mod json;

use crate::models::GeneratedArticle;
use crate::utils::{slugify_title, take_chars};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

const MAX_SLUG_CHARS: usize = 60;

/// Where a post ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenPost {
    pub json_path: PathBuf,
    pub html_path: PathBuf,
    pub image_path: Option<PathBuf>,
}

/// Create `path` if needed and check that a file can be written in it.
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe = path.join("..__probe_write__");
    fs::write(&probe, b"").await?;
    let _ = fs::remove_file(&probe).await;
    info!(path = %path.display(), "Output directory is writable");
    Ok(())
}

/// `<HHMMSS>_<slug>`, with a fallback slug for titles that have no usable characters.
pub fn file_stem(title: &str, now: DateTime<Local>) -> String {
    let slug = take_chars(&slugify_title(title), MAX_SLUG_CHARS);
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "article" } else { slug };
    format!("{}_{}", now.format("%H%M%S"), slug)
}

/// Move a file, copying across filesystems when a rename is not possible.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to).await?;
    fs::remove_file(from).await
}

/// Move the temporary image next to the article. Failures drop the image.
async fn adopt_image(temp: &Path, dir: &Path, stem: &str) -> Option<PathBuf> {
    let ext = temp.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
    let target = dir.join(format!("{stem}.{ext}"));
    match move_file(temp, &target).await {
        Ok(()) => Some(target),
        Err(e) => {
            warn!(from = %temp.display(), error = %e, "Failed to move header image; writing the article without it");
            let _ = fs::remove_file(temp).await;
            None
        }
    }
}

/// Write `article` under `output_dir`, taking ownership of its image file.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display(), title = %article.title))]
pub async fn write_post(article: &GeneratedArticle, output_dir: &Path) -> std::io::Result<WrittenPost> {
    let now = Local::now();
    let dir = output_dir.join(now.format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dir).await?;
    let stem = file_stem(&article.title, now);

    let image_path = match &article.image_path {
        Some(temp) => adopt_image(temp, &dir, &stem).await,
        None => None,
    };
    let stored = GeneratedArticle {
        image_path: image_path.clone(),
        image_url: image_path.as_ref().and(article.image_url.clone()),
        ..article.clone()
    };

    let json_path = dir.join(format!("{stem}.json"));
    json::write_article(&stored, now, &json_path).await?;

    let html_path = dir.join(format!("{stem}.html"));
    let image_name = image_path
        .as_deref()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str());
    fs::write(&html_path, html::render(&stored, image_name)).await?;
    info!(path = %html_path.display(), "Wrote HTML preview");

    Ok(WrittenPost {
        json_path,
        html_path,
        image_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(image_path: Option<PathBuf>) -> GeneratedArticle {
        GeneratedArticle {
            title: "GPT-4o: What's New?".into(),
            content: "<p>Body</p>".into(),
            image_url: image_path.as_ref().map(|_| "https://images/regular".to_string()),
            image_path,
        }
    }

    #[test]
    fn test_file_stem() {
        let now = Local.with_ymd_and_hms(2025, 5, 6, 9, 30, 15).unwrap();
        assert_eq!(file_stem("GPT-4o: What's New?", now), "093015_gpt-4o-whats-new");
        assert_eq!(file_stem("!!!", now), "093015_article");
        let long = "word ".repeat(40);
        assert!(file_stem(&long, now).chars().count() <= 7 + MAX_SLUG_CHARS);
    }

    #[tokio::test]
    async fn test_write_post_moves_image() {
        let out = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let temp_image = scratch.path().join("ai_post_image_x.jpg");
        fs::write(&temp_image, b"jpeg").await.unwrap();

        let written = write_post(&article(Some(temp_image.clone())), out.path()).await.unwrap();

        assert!(!temp_image.exists());
        let image = written.image_path.unwrap();
        assert_eq!(fs::read(&image).await.unwrap(), b"jpeg");
        assert_eq!(image.extension().unwrap(), "jpg");
        assert_eq!(image.parent(), written.json_path.parent());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written.json_path).await.unwrap()).unwrap();
        assert_eq!(json["title"], "GPT-4o: What's New?");
        assert_eq!(json["image_path"], image.to_string_lossy().as_ref());

        let html = fs::read_to_string(&written.html_path).await.unwrap();
        assert!(html.contains(image.file_name().unwrap().to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_write_post_without_image() {
        let out = tempfile::tempdir().unwrap();
        let written = write_post(&article(None), out.path()).await.unwrap();

        assert!(written.image_path.is_none());
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written.json_path).await.unwrap()).unwrap();
        assert!(json.get("image_path").is_none());
        assert!(json.get("image_url").is_none());
    }

    #[tokio::test]
    async fn test_missing_temp_image_is_dropped() {
        let out = tempfile::tempdir().unwrap();
        let gone = out.path().join("does-not-exist.jpg");
        let written = write_post(&article(Some(gone)), out.path()).await.unwrap();
        assert!(written.image_path.is_none());
        assert!(written.json_path.exists());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
