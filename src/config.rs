//! Runtime configuration.
//!
//! [`Config`] is built once in `main` from the parsed [`Cli`] and handed to
//! every component by reference. Tunables that shape generation live in
//! [`GenerationSettings`], which can be overridden from a YAML file; any key
//! left out of the file keeps its default.

use crate::cli::Cli;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Which length profile to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleVariant {
    Long,
    Short,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub newsapi_key: Option<String>,
    pub unsplash_access_key: Option<String>,
    pub banana_api_key: Option<String>,
    /// Raw image source selector; parsed by the image sourcer so an unknown
    /// value only disables images.
    pub image_source: String,
    pub stock_fallback_to_generative: bool,
    pub want_image: bool,
    pub max_retries: usize,
    pub variant: ArticleVariant,
    pub history_file: PathBuf,
    pub output_dir: PathBuf,
    pub debug_dir: Option<PathBuf>,
    pub settings: GenerationSettings,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let openai_base_url = non_empty(cli.openai_base_url.as_deref())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let raw_key = non_empty(cli.openai_api_key.as_deref()).ok_or(ConfigError::MissingApiKey)?;
        let enforce_prefix = openai_base_url.trim_end_matches('/') == DEFAULT_OPENAI_BASE_URL;
        let openai_api_key = sanitize_api_key(&raw_key, enforce_prefix)?;

        let settings = match &cli.settings {
            Some(path) => GenerationSettings::load(Path::new(path))?,
            None => GenerationSettings::default(),
        };

        let config = Config {
            openai_api_key,
            openai_base_url,
            newsapi_key: non_empty(cli.newsapi_key.as_deref()),
            unsplash_access_key: non_empty(cli.unsplash_access_key.as_deref()),
            banana_api_key: non_empty(cli.banana_api_key.as_deref()),
            image_source: cli.image_source.trim().to_lowercase(),
            stock_fallback_to_generative: cli.dalle_fallback,
            want_image: !cli.no_image,
            max_retries: cli.max_retries.max(1),
            variant: if cli.short {
                ArticleVariant::Short
            } else {
                ArticleVariant::Long
            },
            history_file: PathBuf::from(&cli.history_file),
            output_dir: PathBuf::from(&cli.output_dir),
            debug_dir: cli.debug.then(|| PathBuf::from("debug_output")),
            settings,
        };

        info!(
            image_source = %config.image_source,
            want_image = config.want_image,
            max_retries = config.max_retries,
            variant = ?config.variant,
            newsapi = config.newsapi_key.is_some(),
            unsplash = config.unsplash_access_key.is_some(),
            banana = config.banana_api_key.is_some(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Length profile for the configured variant.
    pub fn length(&self) -> &LengthTargets {
        match self.variant {
            ArticleVariant::Long => &self.settings.long,
            ArticleVariant::Short => &self.settings.short,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Clean up a pasted API key.
///
/// Secret stores sometimes prepend junk to the value; everything before the
/// first `sk-` is dropped. With `enforce_prefix` the result must look like an
/// OpenAI key. Only a 20 character preview ever reaches the error message.
pub fn sanitize_api_key(raw: &str, enforce_prefix: bool) -> Result<String, ConfigError> {
    let key = match raw.find("sk-") {
        Some(idx) => raw[idx..].trim(),
        None => raw.trim(),
    };

    if enforce_prefix && !key.starts_with("sk-") {
        let preview: String = raw
            .replace(['\n', '\r'], " ")
            .chars()
            .take(20)
            .collect();
        return Err(ConfigError::InvalidApiKey { preview });
    }
    if key.starts_with("sk-proj-") {
        warn!("Project-scoped API key in use; requests count against the project quota");
    }
    Ok(key.to_string())
}

/// Thresholds used by the similarity classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateThresholds {
    /// Title-to-title Jaccard similarity above which two titles are duplicates.
    pub title_similarity: f64,
    /// Title-to-theme Jaccard similarity above which a title repeats a theme.
    pub theme_similarity: f64,
    /// Titles longer than this sharing this many leading characters are duplicates.
    pub prefix_chars: usize,
    /// Themes this short or shorter are not compared.
    pub min_theme_chars: usize,
}

impl Default for DuplicateThresholds {
    fn default() -> Self {
        Self {
            title_similarity: 0.7,
            theme_similarity: 0.6,
            prefix_chars: 30,
            min_theme_chars: 10,
        }
    }
}

/// Length profile of one article variant, in characters of plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthTargets {
    /// Drafts shorter than this get one continuation pass.
    pub min_chars: usize,
    /// Length the prompts ask for.
    pub target_chars: usize,
    /// Smallest continuation ever requested.
    pub floor_chars: usize,
    pub draft_max_tokens: u32,
    pub continuation_max_tokens: u32,
}

impl LengthTargets {
    pub fn long() -> Self {
        Self {
            min_chars: 4500,
            target_chars: 5000,
            floor_chars: 800,
            draft_max_tokens: 4500,
            continuation_max_tokens: 2000,
        }
    }

    pub fn short() -> Self {
        Self {
            min_chars: 1800,
            target_chars: 2000,
            floor_chars: 400,
            draft_max_tokens: 2500,
            continuation_max_tokens: 1000,
        }
    }

    /// How many more characters to ask for, or `None` when the body is long enough.
    pub fn shortfall(&self, current: usize) -> Option<usize> {
        (current < self.min_chars)
            .then(|| self.target_chars.saturating_sub(current).max(self.floor_chars))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub poll_interval_ms: u64,
    pub poll_budget_secs: u64,
    /// Fall back from the fast generator to stock photos.
    pub fast_fallback_to_stock: bool,
    pub image_model: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            poll_budget_secs: 30,
            fast_fallback_to_stock: true,
            image_model: "dall-e-3".to_string(),
        }
    }
}

impl ImageSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_budget(&self) -> Duration {
        Duration::from_secs(self.poll_budget_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    /// Language the article is written in.
    pub article_language: String,
    /// Language filter passed to the news search API.
    pub news_language: String,
    pub draft_temperature: f32,
    pub recall_temperature: f32,
    pub recall_max_tokens: u32,
    pub keyword_temperature: f32,
    pub keyword_max_tokens: u32,
    /// Title used when a digest-based draft comes back without one.
    pub default_title: String,
    pub completion_timeout_secs: u64,
    pub duplicate: DuplicateThresholds,
    pub long: LengthTargets,
    pub short: LengthTargets,
    pub feeds: Vec<String>,
    pub fallback_topics: Vec<String>,
    pub images: ImageSettings,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            article_language: "Japanese".to_string(),
            news_language: "ja".to_string(),
            draft_temperature: 0.8,
            recall_temperature: 0.7,
            recall_max_tokens: 1000,
            keyword_temperature: 0.7,
            keyword_max_tokens: 50,
            default_title: "最新AI技術の動向".to_string(),
            completion_timeout_secs: 180,
            duplicate: DuplicateThresholds::default(),
            long: LengthTargets::long(),
            short: LengthTargets::short(),
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            fallback_topics: DEFAULT_TOPICS.iter().map(|s| s.to_string()).collect(),
            images: ImageSettings::default(),
        }
    }
}

impl GenerationSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path_str = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::SettingsIo {
            path: path_str.clone(),
            source,
        })?;
        let settings: GenerationSettings =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::SettingsParse {
                path: path_str.clone(),
                source,
            })?;
        info!(path = %path_str, "Loaded generation settings");
        Ok(settings)
    }
}

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://openai.com/news/rss.xml",
    "https://blogs.microsoft.com/ai/feed/",
    "https://aws.amazon.com/blogs/machine-learning/feed/",
    "https://research.google/blog/rss/",
    "https://www.mit.edu/rss/news.xml",
    "https://venturebeat.com/category/ai/feed/",
    "https://techcrunch.com/category/artificial-intelligence/feed/",
    "https://www.artificialintelligence-news.com/feed/",
];

pub const DEFAULT_TOPICS: &[&str] = &[
    "ChatGPTとClaudeの比較：どちらが優れているか",
    "GPT-4oの新機能と実用的な活用法",
    "AI画像生成ツール比較：Midjourney vs DALL-E 3 vs Stable Diffusion",
    "AIプログラミングアシスタント：GitHub Copilot vs Cursor vs Codeium",
    "AI音声生成技術の最新動向：ElevenLabsとその競合",
    "AI動画生成の最前線：Runway MLとPikaの比較",
    "AI検索エンジン：Perplexity vs Googleの違い",
    "AIコードレビューツールの実用性",
    "AI翻訳ツールの精度比較：DeepL vs Google翻訳 vs ChatGPT",
    "AI音楽生成：Suno AIとUdioの可能性",
    "AI自動化ツール：Zapier vs Make vs n8n",
    "AIデータ分析ツールの比較",
    "AIライティングツール：Jasper vs Copy.ai vs Writesonic",
    "AIデザインツール：Canva AI vs Adobe Firefly",
    "AI教育ツールの最新動向",
    "AIヘルスケアアプリケーションの現状",
    "AI金融サービス：ロボアドバイザーの比較",
    "AIセキュリティツールの重要性",
    "AIマーケティングツールの活用方法",
    "AI開発フレームワーク：LangChain vs LlamaIndex",
];
