//! # AI Post Pipeline
//!
//! Writes one long-form Japanese article about recent AI developments,
//! avoiding topics that were already covered in the last 30 days, and pairs
//! it with a header image.
//!
//! ## Features
//!
//! - Gathers recent AI news from NewsAPI, a set of RSS feeds, or, as a last
//!   resort, the language model's own knowledge
//! - Falls back to a rotating list of evergreen topics when no news is available
//! - Rejects drafts that duplicate recent posts and retries with another topic
//! - Tops up drafts that come out shorter than the target length
//! - Sources a header image from a fast generator, stock photos or a standard
//!   generator, with configurable fallbacks
//! - Writes the article as JSON and HTML with the image alongside
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=sk-... ai_post_pipeline -o ./posts
//! ```
//!
//! ## Architecture
//!
//! 1. **News**: build a digest of recent AI news ([`news`])
//! 2. **Drafting**: write, duplicate-check and retry ([`draft`], [`orchestrator`])
//! 3. **Images**: fetch or generate a header image ([`images`])
//! 4. **Output**: write the post to disk ([`outputs`])

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod artifacts;
mod cli;
mod config;
mod draft;
mod error;
mod fallback;
mod history;
mod images;
mod models;
mod news;
mod orchestrator;
mod outputs;
mod pipeline;
mod similarity;
mod utils;

use cli::Cli;
use config::Config;
use error::PipelineError;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ai_post_pipeline starting up");

    let args = Cli::parse();
    debug!(output_dir = %args.output_dir, history_file = %args.history_file, "Parsed CLI arguments");

    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    // Early check: ensure the output dir is writable before spending tokens
    if let Err(e) = outputs::ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let article = match pipeline::generate_article(
        &config,
        &config.image_source,
        config.want_image,
        config.max_retries,
    )
    .await
    {
        Ok(article) => article,
        Err(e) => {
            report_failure(&e);
            std::process::exit(1);
        }
    };

    let written = match outputs::write_post(&article, &config.output_dir).await {
        Ok(written) => written,
        Err(e) => {
            report_failure(&PipelineError::Output(e));
            std::process::exit(1);
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        title = %article.title,
        json = %written.json_path.display(),
        html = %written.html_path.display(),
        image = ?written.image_path,
        "Execution complete"
    );

    Ok(())
}

fn report_failure(e: &PipelineError) {
    error!(category = ?e.category(), error = %e, "Article generation failed");
    for line in e.diagnostic().lines() {
        error!("{line}");
    }
}
