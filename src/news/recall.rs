//! Last-resort news source: ask the model what it knows about recent AI
//! developments. The answer comes from training data, so it is only used when
//! the live sources are unavailable.

use crate::api::{Completion, CompletionRequest};
use crate::artifacts::Artifacts;
use crate::config::GenerationSettings;
use tracing::{info, instrument, warn};

const SYSTEM_PROMPT: &str = "You are an expert in AI technology. You provide accurate information about recent AI news and technology trends.";

const USER_PROMPT: &str = "\
Give a broad overview of the latest news and technology trends in artificial intelligence.
Look beyond the large tech companies: include startups, research papers, ethical debates and regulation.

Prioritise information about:
- New AI models or services, including smaller releases
- Comparisons and evaluations of AI tools
- Practical, real-world applications of AI
- Current trends and debates in the AI industry
- New developments in AI regulation and ethics

Summarise 5-7 recent items concisely. Write each item as \"- Title: description\".";

#[instrument(level = "info", skip_all)]
pub async fn digest<C: Completion>(
    completion: &C,
    settings: &GenerationSettings,
    artifacts: &Artifacts,
) -> Option<String> {
    let request = CompletionRequest {
        system: SYSTEM_PROMPT,
        user: USER_PROMPT,
        temperature: settings.recall_temperature,
        max_tokens: settings.recall_max_tokens,
    };

    match completion.complete(&request).await {
        Ok(text) if !text.trim().is_empty() => {
            info!(lines = text.lines().count(), "Recalled recent AI news from the model");
            artifacts.save("openai_news_search.txt", &text).await;
            Some(text)
        }
        Ok(_) => {
            warn!("Model returned an empty news summary");
            None
        }
        Err(e) => {
            warn!(error = %e, "Model news recall failed");
            None
        }
    }
}
