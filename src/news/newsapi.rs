//! NewsAPI `everything` search.
//!
//! Queries the last seven days of AI coverage, newest first, and keeps the
//! top three articles that carry both a title and a description.

use super::{NewsSearch, format_digest};
use crate::artifacts::Artifacts;
use crate::error::SourceError;
use crate::models::NewsItem;
use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::{info, instrument, warn};
use url::Url;

const ENDPOINT: &str = "https://newsapi.org/v2/everything";
const QUERY: &str = "artificial intelligence OR AI OR machine learning OR ChatGPT OR GPT-4";
const RECENCY_DAYS: i64 = 7;
const PAGE_SIZE: u32 = 5;
const DIGEST_ITEMS: usize = 3;
const TIMEOUT: StdDuration = StdDuration::from_secs(10);

#[derive(Debug, Clone)]
pub struct NewsQuery<'a> {
    pub query: &'a str,
    pub language: &'a str,
    pub sort_by: &'a str,
    pub page_size: u32,
    pub from: NaiveDate,
    pub timeout: StdDuration,
}

impl<'a> NewsQuery<'a> {
    /// The AI news query for the past week.
    pub fn recent_ai(language: &'a str) -> Self {
        Self {
            query: QUERY,
            language,
            sort_by: "publishedAt",
            page_size: PAGE_SIZE,
            from: Local::now().date_naive() - Duration::days(RECENCY_DAYS),
            timeout: TIMEOUT,
        }
    }

    pub fn url(&self) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            ENDPOINT,
            &[
                ("q", self.query.to_string()),
                ("language", self.language.to_string()),
                ("sortBy", self.sort_by.to_string()),
                ("pageSize", self.page_size.to_string()),
                ("from", self.from.format("%Y-%m-%d").to_string()),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<ArticleSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

impl SearchArticle {
    #[cfg(test)]
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    /// Articles without both a title and a description are not worth citing.
    fn into_item(self) -> Option<NewsItem> {
        let headline = self.title.filter(|t| !t.trim().is_empty())?;
        let blurb = self.description.filter(|d| !d.trim().is_empty())?;
        Some(NewsItem {
            source: self.source.and_then(|s| s.name).unwrap_or_default(),
            headline: headline.trim().to_string(),
            blurb: blurb.trim().to_string(),
            link: self.url.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<SearchArticle>,
}

/// Perform the HTTP search.
pub async fn search(
    http: &reqwest::Client,
    api_key: &str,
    query: &NewsQuery<'_>,
) -> Result<Vec<SearchArticle>, SourceError> {
    let url = query
        .url()
        .map_err(|e| SourceError::Parse(format!("invalid NewsAPI url: {e}")))?;
    let response = http
        .get(url)
        .header("X-Api-Key", api_key)
        .timeout(query.timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Status { status, body });
    }
    let parsed: SearchResponse = response.json().await?;
    Ok(parsed.articles)
}

/// Top articles formatted as a digest.
pub fn to_digest(articles: Vec<SearchArticle>) -> Option<String> {
    let items: Vec<NewsItem> = articles
        .into_iter()
        .take(DIGEST_ITEMS)
        .filter_map(SearchArticle::into_item)
        .collect();
    (!items.is_empty()).then(|| format_digest(&items))
}

#[instrument(level = "info", skip_all)]
pub async fn digest<S: NewsSearch>(search: &S, language: &str, artifacts: &Artifacts) -> Option<String> {
    let query = NewsQuery::recent_ai(language);
    let articles = match search.search(&query).await {
        Ok(articles) => articles,
        Err(e) => {
            warn!(error = %e, "News search failed");
            return None;
        }
    };

    let total = articles.len();
    let digest = to_digest(articles)?;
    info!(total, "Fetched news from search API");
    artifacts.save("newsapi_result.txt", &digest).await;
    Some(digest)
}
