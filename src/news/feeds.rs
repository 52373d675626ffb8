//! RSS feeds from AI labs and tech press.
//!
//! Each feed is fetched on its own with a short timeout; a slow or broken
//! feed is skipped without affecting the others. The newest two items of
//! every feed make it into the digest; a story syndicated by several feeds
//! appears once.

use super::{FeedSource, format_digest};
use crate::artifacts::Artifacts;
use crate::error::SourceError;
use crate::models::NewsItem;
use crate::utils::{html_to_text, take_chars};
use itertools::Itertools;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const FEED_TIMEOUT: Duration = Duration::from_secs(5);
const ITEMS_PER_FEED: usize = 2;
const BLURB_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

/// Parse an RSS 2.0 document into at most `limit` news items.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<NewsItem>, SourceError> {
    let doc: RssDocument =
        quick_xml::de::from_str(xml).map_err(|e| SourceError::Parse(e.to_string()))?;

    let source = doc
        .channel
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown Source".to_string());

    Ok(doc
        .channel
        .items
        .into_iter()
        .take(limit)
        .map(|item| {
            let blurb = item
                .description
                .map(|d| html_to_text(&d))
                .filter(|d| !d.is_empty())
                .map(|d| format!("{}...", take_chars(&d, BLURB_CHARS)))
                .unwrap_or_default();
            NewsItem {
                source: source.clone(),
                headline: item
                    .title
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "No Title".to_string()),
                blurb,
                link: item.link.map(|l| l.trim().to_string()).unwrap_or_default(),
            }
        })
        .collect())
}

#[instrument(level = "info", skip_all, fields(feeds = urls.len()))]
pub async fn digest<F: FeedSource>(feeds: &F, urls: &[String], artifacts: &Artifacts) -> Option<String> {
    let mut items = Vec::new();

    for url in urls {
        debug!(%url, "Fetching feed");
        let parsed = match feeds.fetch(url, FEED_TIMEOUT).await {
            Ok(xml) => parse_feed(&xml, ITEMS_PER_FEED),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(feed_items) => {
                debug!(%url, count = feed_items.len(), "Parsed feed");
                items.extend(feed_items);
            }
            Err(e) => warn!(%url, error = %e, "Feed unavailable"),
        }
    }

    let items: Vec<NewsItem> = items
        .into_iter()
        .unique_by(|item| item.headline.to_lowercase())
        .collect();
    if items.is_empty() {
        return None;
    }
    let digest = format_digest(&items);
    info!(count = items.len(), "Fetched news from feeds");
    artifacts.save("rss_news.txt", &digest).await;
    Some(digest)
}
