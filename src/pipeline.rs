//! One generation cycle, end to end.
//!
//! ```text
//! news digest ──► retry loop (draft ─► duplicate check) ──► length repair
//!      │                                                       │
//!      └─ none: fallback topics                 history entry ◄┘
//!                                                              │
//!                                     header image (optional) ◄┘
//! ```
//!
//! [`Pipeline`] is generic over every collaborator so the whole cycle can run
//! against in-memory services; [`generate_article`] wires it to the real HTTP
//! clients.

use crate::api::{Completion, OpenAiClient};
use crate::artifacts::Artifacts;
use crate::config::Config;
use crate::draft::DraftGenerator;
use crate::error::{PipelineError, SourceError};
use crate::history::HistoryStore;
use crate::images::fast::BananaClient;
use crate::images::standard::DalleClient;
use crate::images::stock::UnsplashClient;
use crate::images::{FastImageService, ImageSourcer, StandardImageService, StockPhotoService};
use crate::models::GeneratedArticle;
use crate::news::{FeedSource, HttpNewsClient, NewsSearch, NewsSourcer};
use crate::orchestrator::{Outcome, RetryOrchestrator};
use crate::similarity::SimilarityClassifier;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

const USER_AGENT: &str = concat!("ai_post_pipeline/", env!("CARGO_PKG_VERSION"));

pub struct Pipeline<'a, C, N, F, SP, FI, SI> {
    config: &'a Config,
    completion: &'a C,
    search: Option<&'a N>,
    feeds: &'a F,
    stock: &'a SP,
    fast: &'a FI,
    standard: &'a SI,
}

impl<'a, C, N, F, SP, FI, SI> Pipeline<'a, C, N, F, SP, FI, SI>
where
    C: Completion,
    N: NewsSearch,
    F: FeedSource,
    SP: StockPhotoService,
    FI: FastImageService,
    SI: StandardImageService,
{
    pub fn new(
        config: &'a Config,
        completion: &'a C,
        search: Option<&'a N>,
        feeds: &'a F,
        stock: &'a SP,
        fast: &'a FI,
        standard: &'a SI,
    ) -> Self {
        Self {
            config,
            completion,
            search,
            feeds,
            stock,
            fast,
            standard,
        }
    }

    /// Produce one article.
    ///
    /// # Arguments
    ///
    /// * `image_source` - Image selector; unknown values just skip the image
    /// * `want_image` - Whether to source a header image at all
    /// * `max_retries` - Upper bound on drafts when duplicates are detected
    /// * `rng` - Randomness for fallback topic selection
    ///
    /// # Returns
    ///
    /// The article, or a [`PipelineError`] when the completion service fails.
    /// Missing news and missing images never fail the run.
    #[instrument(level = "info", skip_all, fields(image_source = %image_source, want_image = want_image, max_retries = max_retries))]
    pub async fn generate_article<R: Rng + ?Sized>(
        &self,
        image_source: &str,
        want_image: bool,
        max_retries: usize,
        rng: &mut R,
    ) -> Result<GeneratedArticle, PipelineError> {
        let settings = &self.config.settings;
        let artifacts = Artifacts::new(self.config.debug_dir.clone());

        let digest = NewsSourcer::new(self.completion, self.search, self.feeds, settings, &artifacts)
            .fetch_digest()
            .await;
        if digest.is_none() {
            warn!("No recent news available; writing from the fallback topic list");
        }

        let drafter = DraftGenerator::new(self.completion, settings, self.config.length(), &artifacts);
        let classifier = SimilarityClassifier::new(settings.duplicate.clone());
        let history = HistoryStore::new(&self.config.history_file);

        let generation = RetryOrchestrator::new(
            &drafter,
            &classifier,
            &history,
            &settings.fallback_topics,
            max_retries,
        )
        .run(digest.as_deref(), rng)
        .await?;

        let candidate = generation.candidate;
        info!(
            title = %candidate.title,
            attempts = generation.attempts,
            accepted = generation.outcome == Outcome::Accepted,
            "Article text ready"
        );

        let image = if want_image {
            ImageSourcer::new(
                self.completion,
                self.stock,
                self.fast,
                self.standard,
                settings,
                self.config.stock_fallback_to_generative,
            )
            .fetch(image_source, &candidate.theme)
            .await
        } else {
            info!("Image sourcing disabled");
            None
        };

        Ok(GeneratedArticle {
            title: candidate.title,
            content: candidate.content,
            image_path: image.as_ref().map(|i| i.local_path.clone()),
            image_url: image.map(|i| i.source_url),
        })
    }
}

/// Run one cycle against the live services described by `config`.
pub async fn generate_article(
    config: &Config,
    image_source: &str,
    want_image: bool,
    max_retries: usize,
) -> Result<GeneratedArticle, PipelineError> {
    let t0 = Instant::now();
    let settings = &config.settings;

    let openai = OpenAiClient::new(
        &config.openai_api_key,
        &config.openai_base_url,
        &settings.model,
        Duration::from_secs(settings.completion_timeout_secs),
    )?;
    let news = HttpNewsClient::new(config.newsapi_key.clone())?;
    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(SourceError::from)?;
    let stock = UnsplashClient::new(http.clone(), config.unsplash_access_key.clone());
    let fast = BananaClient::new(http, config.banana_api_key.clone());
    let standard = DalleClient::new(&openai, &settings.images.image_model);

    let search = config.newsapi_key.as_ref().map(|_| &news);
    let article = Pipeline::new(config, &openai, search, &news, &stock, &fast, &standard)
        .generate_article(image_source, want_image, max_retries, &mut rand::rng())
        .await?;

    info!(
        elapsed_secs = t0.elapsed().as_secs(),
        title = %article.title,
        has_image = article.image_path.is_some(),
        "Generation cycle complete"
    );
    Ok(article)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedCompletion;
    use crate::config::{ArticleVariant, GenerationSettings};
    use crate::error::CompletionError;
    use crate::images::testing::{StubFast, StubStandard, StubStock};
    use crate::news::testing::{StaticFeeds, StaticSearch};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::Path;

    const FEED: &str = "https://feed.example/rss";

    fn test_config(dir: &Path) -> Config {
        Config {
            openai_api_key: "sk-test".into(),
            openai_base_url: crate::config::DEFAULT_OPENAI_BASE_URL.into(),
            newsapi_key: None,
            unsplash_access_key: None,
            banana_api_key: None,
            image_source: "stock".into(),
            stock_fallback_to_generative: false,
            want_image: true,
            max_retries: 3,
            variant: ArticleVariant::Long,
            history_file: dir.join("post_history.json"),
            output_dir: dir.join("posts"),
            debug_dir: None,
            settings: GenerationSettings {
                feeds: vec![FEED.to_string()],
                ..GenerationSettings::default()
            },
        }
    }

    fn feeds() -> StaticFeeds {
        let mut feeds = StaticFeeds::default();
        feeds.documents.insert(
            FEED.to_string(),
            "<rss><channel><title>Lab</title><item><title>Model X</title><description>Faster</description></item></channel></rss>"
                .to_string(),
        );
        feeds
    }

    fn long_draft(title: &str) -> String {
        format!("Title: {title}\n<p>{}</p>", "語".repeat(4600))
    }

    #[tokio::test]
    async fn test_full_cycle_with_stock_image() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let completion = ScriptedCompletion::new([long_draft("Model X arrives"), "robot".to_string()]);
        let feeds = feeds();
        let stock = StubStock::returning(Some("https://images/regular"));
        let fast = StubFast::rejecting();
        let standard = StubStandard::returning(None);
        let mut rng = StdRng::seed_from_u64(5);

        let article = Pipeline::<_, StaticSearch, _, _, _, _>::new(
            &config, &completion, None, &feeds, &stock, &fast, &standard,
        )
        .generate_article("stock", true, 3, &mut rng)
        .await
        .unwrap();

        assert_eq!(article.title, "Model X arrives");
        assert_eq!(article.image_url.as_deref(), Some("https://images/regular"));
        let image_path = article.image_path.unwrap();
        assert!(image_path.exists());
        tokio::fs::remove_file(&image_path).await.unwrap();

        assert!(completion.calls.borrow()[0].user.contains("- [Lab] Model X: Faster..."));
        let history = HistoryStore::new(&config.history_file).load().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].title, "Model X arrives");
        assert!(history[0].theme.starts_with("- [Lab] Model X"));
    }

    #[tokio::test]
    async fn test_no_image_requested() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let completion = ScriptedCompletion::new([long_draft("Text only")]);
        let feeds = feeds();
        let stock = StubStock::returning(Some("https://images/regular"));
        let fast = StubFast::rejecting();
        let standard = StubStandard::returning(None);
        let mut rng = StdRng::seed_from_u64(5);

        let article = Pipeline::<_, StaticSearch, _, _, _, _>::new(
            &config, &completion, None, &feeds, &stock, &fast, &standard,
        )
        .generate_article("stock", false, 3, &mut rng)
        .await
        .unwrap();

        assert!(article.image_path.is_none());
        assert!(article.image_url.is_none());
        assert_eq!(completion.call_count(), 1);
        assert!(stock.queries.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_topic_when_no_news() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.settings.feeds.clear();
        config.settings.fallback_topics = vec!["Only topic".to_string()];
        // Recall fails, then the draft succeeds.
        let completion = ScriptedCompletion::new([String::new(), long_draft("Topic article")]);
        let feeds = StaticFeeds::default();
        let search = StaticSearch {
            fail: true,
            ..Default::default()
        };
        let stock = StubStock::returning(None);
        let fast = StubFast::rejecting();
        let standard = StubStandard::returning(None);
        let mut rng = StdRng::seed_from_u64(5);

        let article = Pipeline::new(&config, &completion, Some(&search), &feeds, &stock, &fast, &standard)
            .generate_article("unknown-source", true, 3, &mut rng)
            .await
            .unwrap();

        assert_eq!(article.title, "Topic article");
        assert!(article.image_path.is_none());
        assert!(completion.calls.borrow()[1].user.contains("トピック: Only topic"));
        let history = HistoryStore::new(&config.history_file).load().await;
        assert_eq!(history[0].theme, "Only topic");
    }

    #[tokio::test]
    async fn test_completion_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let completion = ScriptedCompletion::failing(CompletionError::Auth("invalid_api_key".into()));
        let feeds = feeds();
        let stock = StubStock::returning(None);
        let fast = StubFast::rejecting();
        let standard = StubStandard::returning(None);
        let mut rng = StdRng::seed_from_u64(5);

        let err = Pipeline::<_, StaticSearch, _, _, _, _>::new(
            &config, &completion, None, &feeds, &stock, &fast, &standard,
        )
        .generate_article("stock", true, 3, &mut rng)
        .await
        .unwrap_err();

        assert_eq!(err.category(), crate::error::FailureCategory::Authentication);
        assert!(HistoryStore::new(&config.history_file).load().await.is_empty());
    }
}
