//! AI news gathering.
//!
//! Three sources are tried in order and the first one that yields anything
//! becomes the digest the article is written from:
//!
//! | Stage | Module | Needs |
//! |-------|--------|-------|
//! | Structured news search | [`newsapi`] | `NEWSAPI_KEY` |
//! | Syndication feeds | [`feeds`] | nothing |
//! | Model recall | [`recall`] | the completion service |
//!
//! Every stage is fault tolerant: errors and timeouts are logged and count as
//! "no result". When all three come back empty the caller switches to the
//! fallback topic list.

pub mod feeds;
pub mod newsapi;
pub mod recall;

use crate::api::Completion;
use crate::artifacts::Artifacts;
use crate::config::GenerationSettings;
use crate::error::SourceError;
use crate::fallback::{Strategy, first_success};
use crate::models::NewsItem;
use futures::FutureExt;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub use newsapi::{NewsQuery, SearchArticle};

/// Structured news search API.
pub trait NewsSearch {
    async fn search(&self, query: &NewsQuery<'_>) -> Result<Vec<SearchArticle>, SourceError>;
}

/// Anything that can fetch a syndication document by URL.
pub trait FeedSource {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, SourceError>;
}

/// Format news items as a bulleted digest.
pub fn format_digest(items: &[NewsItem]) -> String {
    items
        .iter()
        .map(NewsItem::digest_line)
        .collect::<Vec<_>>()
        .join("\n")
}

impl NewsItem {
    /// `- [source] headline: blurb (link)`, omitting the parts that are empty.
    pub fn digest_line(&self) -> String {
        let mut line = String::from("- ");
        if !self.source.is_empty() {
            line.push_str(&format!("[{}] ", self.source));
        }
        line.push_str(&self.headline);
        line.push_str(": ");
        line.push_str(&self.blurb);
        if !self.link.is_empty() {
            line.push_str(&format!(" ({})", self.link));
        }
        line
    }
}

pub struct NewsSourcer<'a, C, S, F> {
    completion: &'a C,
    search: Option<&'a S>,
    feeds: &'a F,
    settings: &'a GenerationSettings,
    artifacts: &'a Artifacts,
}

impl<'a, C, S, F> NewsSourcer<'a, C, S, F>
where
    C: Completion,
    S: NewsSearch,
    F: FeedSource,
{
    /// `search` is `None` when no news API credential is configured.
    pub fn new(
        completion: &'a C,
        search: Option<&'a S>,
        feeds: &'a F,
        settings: &'a GenerationSettings,
        artifacts: &'a Artifacts,
    ) -> Self {
        Self {
            completion,
            search,
            feeds,
            settings,
            artifacts,
        }
    }

    /// Gather a digest of recent AI news, or `None` if every source came up empty.
    #[instrument(level = "info", skip_all)]
    pub async fn fetch_digest(&self) -> Option<String> {
        let mut chain = Vec::with_capacity(3);
        if let Some(search) = self.search {
            chain.push(Strategy::new(
                "newsapi",
                newsapi::digest(search, &self.settings.news_language, self.artifacts).boxed_local(),
            ));
        }
        chain.push(Strategy::new(
            "feeds",
            feeds::digest(self.feeds, &self.settings.feeds, self.artifacts).boxed_local(),
        ));
        chain.push(Strategy::new(
            "recall",
            recall::digest(self.completion, self.settings, self.artifacts).boxed_local(),
        ));

        match first_success(chain).await {
            Some((stage, digest)) => {
                info!(stage, lines = digest.lines().count(), "News digest ready");
                Some(digest)
            }
            None => {
                warn!("No news source produced a digest");
                None
            }
        }
    }
}

/// reqwest-backed implementation of both news traits.
#[derive(Debug, Clone)]
pub struct HttpNewsClient {
    http: reqwest::Client,
    newsapi_key: Option<String>,
}

const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; ai_post_pipeline/", env!("CARGO_PKG_VERSION"), ")");

impl HttpNewsClient {
    pub fn new(newsapi_key: Option<String>) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, newsapi_key })
    }
}

impl NewsSearch for HttpNewsClient {
    async fn search(&self, query: &NewsQuery<'_>) -> Result<Vec<SearchArticle>, SourceError> {
        let key = self
            .newsapi_key
            .as_deref()
            .ok_or(SourceError::MissingCredential("NEWSAPI_KEY"))?;
        newsapi::search(&self.http, key, query).await
    }
}

impl FeedSource for HttpNewsClient {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, SourceError> {
        let response = self.http.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status,
                body: crate::utils::truncate_for_log(&body, 200),
            });
        }
        Ok(response.text().await?)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::api::testing::ScriptedCompletion;

    fn rss(items: &[(&str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(t, d)| format!("<item><title>{t}</title><description>{d}</description><link>https://x/{t}</link></item>"))
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Feed</title>{body}</channel></rss>"#)
    }

    fn settings_with_feeds(feeds: &[&str]) -> GenerationSettings {
        GenerationSettings {
            feeds: feeds.iter().map(|s| s.to_string()).collect(),
            ..GenerationSettings::default()
        }
    }

    #[test]
    fn test_digest_line_formats() {
        let full = NewsItem {
            source: "OpenAI".into(),
            headline: "New model".into(),
            blurb: "It is fast".into(),
            link: "https://openai.com/x".into(),
        };
        assert_eq!(full.digest_line(), "- [OpenAI] New model: It is fast (https://openai.com/x)");

        let bare = NewsItem {
            source: String::new(),
            headline: "Headline".into(),
            blurb: "Blurb".into(),
            link: String::new(),
        };
        assert_eq!(bare.digest_line(), "- Headline: Blurb");
    }

    #[tokio::test]
    async fn test_search_wins_when_configured() {
        let completion = ScriptedCompletion::default();
        let search = StaticSearch {
            articles: vec![SearchArticle::new("Title", "Description")],
            ..Default::default()
        };
        let feeds = StaticFeeds::default();
        let settings = settings_with_feeds(&["https://feed"]);
        let artifacts = Artifacts::disabled();

        let digest = NewsSourcer::new(&completion, Some(&search), &feeds, &settings, &artifacts)
            .fetch_digest()
            .await
            .unwrap();

        assert_eq!(digest, "- Title: Description");
        assert!(feeds.fetched.borrow().is_empty());
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_search_falls_back_to_feeds() {
        let completion = ScriptedCompletion::default();
        let search = StaticSearch {
            fail: true,
            ..Default::default()
        };
        let mut feeds = StaticFeeds::default();
        feeds
            .documents
            .insert("https://feed".into(), rss(&[("One", "first"), ("Two", "second"), ("Three", "third")]));
        let settings = settings_with_feeds(&["https://down", "https://feed"]);
        let artifacts = Artifacts::disabled();

        let digest = NewsSourcer::new(&completion, Some(&search), &feeds, &settings, &artifacts)
            .fetch_digest()
            .await
            .unwrap();

        assert_eq!(*search.calls.borrow(), 1);
        assert_eq!(feeds.fetched.borrow().len(), 2);
        assert_eq!(digest.lines().count(), 2);
        assert!(digest.starts_with("- [Feed] One: first..."));
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_search_is_skipped() {
        let completion = ScriptedCompletion::new(["- Model: recalled"]);
        let feeds = StaticFeeds::default();
        let settings = settings_with_feeds(&["https://down"]);
        let artifacts = Artifacts::disabled();

        let digest = NewsSourcer::<_, StaticSearch, _>::new(&completion, None, &feeds, &settings, &artifacts)
            .fetch_digest()
            .await;

        assert_eq!(digest.as_deref(), Some("- Model: recalled"));
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_empty() {
        let completion = ScriptedCompletion::failing(crate::error::CompletionError::Empty);
        let feeds = StaticFeeds::default();
        let settings = settings_with_feeds(&[]);
        let artifacts = Artifacts::disabled();

        let digest = NewsSourcer::<_, StaticSearch, _>::new(&completion, None, &feeds, &settings, &artifacts)
            .fetch_digest()
            .await;
        assert!(digest.is_none());
    }
}
