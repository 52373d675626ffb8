//! Command-line interface definitions.
//!
//! Every credential and switch can come from a flag or from the environment
//! variable of the same purpose, so the binary runs unchanged under a cron
//! job or a CI secret store.

use clap::Parser;

/// Generate one AI news article, check it against recent history and write it out.
///
/// ```sh
/// # Defaults: fast generative image, five duplicate retries
/// ai_post_pipeline --output-dir ./posts
///
/// # Stock photo with generative fallback, short article
/// IMAGE_SOURCE=stock DALLE_FALLBACK=true ai_post_pipeline --short
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Completion service API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// NewsAPI key; the structured news search is skipped without it
    #[arg(long, env = "NEWSAPI_KEY", hide_env_values = true)]
    pub newsapi_key: Option<String>,

    /// Unsplash access key for stock photos
    #[arg(long, env = "UNSPLASH_ACCESS_KEY", hide_env_values = true)]
    pub unsplash_access_key: Option<String>,

    /// Banana API key for fast generative images
    #[arg(long, env = "BANANA_API_KEY", hide_env_values = true)]
    pub banana_api_key: Option<String>,

    /// Primary image source: stock, generative-fast or generative-standard
    #[arg(long, env = "IMAGE_SOURCE", default_value = "generative-fast")]
    pub image_source: String,

    /// Fall back from stock photos to generative-standard images
    #[arg(long, env = "DALLE_FALLBACK", default_value_t = false)]
    pub dalle_fallback: bool,

    /// Skip header image sourcing
    #[arg(long)]
    pub no_image: bool,

    /// Maximum number of generation attempts when duplicates are detected
    #[arg(long, default_value_t = 5)]
    pub max_retries: usize,

    /// Write a short article instead of the long-form default
    #[arg(long)]
    pub short: bool,

    /// Post history file
    #[arg(long, default_value = "post_history.json")]
    pub history_file: String,

    /// Output directory for the finished article
    #[arg(short, long, default_value = "posts")]
    pub output_dir: String,

    /// Optional YAML file overriding generation settings
    #[arg(short, long)]
    pub settings: Option<String>,

    /// Save intermediate model output under debug_output/
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["ai_post_pipeline"]);

        assert_eq!(cli.max_retries, 5);
        assert_eq!(cli.history_file, "post_history.json");
        assert_eq!(cli.output_dir, "posts");
        assert!(!cli.no_image);
        assert!(!cli.short);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "ai_post_pipeline",
            "--image-source",
            "stock",
            "--dalle-fallback",
            "--max-retries",
            "3",
            "--short",
            "-o",
            "/tmp/posts",
            "--debug",
        ]);

        assert_eq!(cli.image_source, "stock");
        assert!(cli.dalle_fallback);
        assert_eq!(cli.max_retries, 3);
        assert!(cli.short);
        assert_eq!(cli.output_dir, "/tmp/posts");
        assert!(cli.debug);
    }
}
