//! JSON output for downstream publishing.

use crate::models::GeneratedArticle;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct PostDocument<'a> {
    generated_at: String,
    #[serde(flatten)]
    article: &'a GeneratedArticle,
}

/// Write `article` as pretty JSON to `path`.
///
/// # Arguments
///
/// * `article` - The finished article, with its image already in place
/// * `generated_at` - Timestamp recorded alongside the article
/// * `path` - Destination file; its directory must exist
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_article(
    article: &GeneratedArticle,
    generated_at: DateTime<Local>,
    path: &Path,
) -> std::io::Result<()> {
    let document = PostDocument {
        generated_at: generated_at.to_rfc3339(),
        article,
    };
    let json = serde_json::to_string_pretty(&document)?;

    if let Err(e) = fs::write(path, json).await {
        error!(error = %e, "Failed to write JSON");
        return Err(e);
    }
    info!("Wrote article JSON");
    Ok(())
}
