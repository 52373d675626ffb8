//! Article drafting.
//!
//! [`DraftGenerator`] turns a news digest or a fallback topic into a
//! [`Candidate`]:
//!
//! 1. Prompt the model with the house rules (length, section structure,
//!    HTML conventions, a `Title:` first line).
//! 2. Split the raw output into title and body with [`parse_draft`].
//! 3. Wrap plain-text bodies in `<p>` tags.
//! 4. If the visible text is shorter than the variant's minimum, ask once
//!    for a continuation and append it ([`Drafter::extend_if_short`]).
//!
//! The orchestrator drives steps 1-3 per attempt and runs step 4 only on the
//! candidate it keeps. On the last allowed attempt the draft is kept either
//! way, so all four steps run together through [`Drafter::generate`].

use crate::api::{Completion, CompletionRequest};
use crate::artifacts::Artifacts;
use crate::config::{GenerationSettings, LengthTargets};
use crate::error::CompletionError;
use crate::models::Candidate;
use crate::utils::{plain_text_len, take_chars, truncate_for_log, wrap_paragraphs};
use chrono::Local;
use tracing::{debug, info, instrument, warn};

mod prompts;

use prompts::Prompts;

/// Characters of the digest kept as a candidate's theme.
pub const THEME_CHARS: usize = 100;

/// Lines longer than this never pass as a bare title.
const MAX_BARE_TITLE_CHARS: usize = 100;

/// Labels accepted in front of the title line.
const TITLE_LABELS: &[&str] = &["タイトル:", "タイトル：", "title:", "title：", "題名:", "題名："];

/// What an article is written from.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicSource {
    /// Flattened news digest.
    Digest(String),
    /// One entry of the fallback topic list.
    Topic(String),
}

impl TopicSource {
    /// Theme recorded in history and used for image prompts.
    pub fn theme(&self) -> String {
        match self {
            TopicSource::Digest(digest) => take_chars(digest, THEME_CHARS),
            TopicSource::Topic(topic) => topic.clone(),
        }
    }
}

/// Drafting as seen by the retry loop.
pub trait Drafter {
    /// Write a candidate from `source`, steering away from the `avoid` titles.
    async fn draft(&self, source: &TopicSource, avoid: &[String]) -> Result<Candidate, CompletionError>;

    /// Run the length-repair pass on a candidate that is about to be kept.
    async fn extend_if_short(&self, candidate: Candidate) -> Candidate;

    /// Draft and length-repair in one go, for a candidate that will be kept
    /// whatever the duplicate check says.
    async fn generate(&self, source: &TopicSource, avoid: &[String]) -> Result<Candidate, CompletionError> {
        let candidate = self.draft(source, avoid).await?;
        Ok(self.extend_if_short(candidate).await)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDraft {
    /// `None` when neither a labelled nor a bare title line was found.
    pub title: Option<String>,
    pub body: String,
}

/// Strip a title label from a line, if it carries one.
fn labelled_title(line: &str) -> Option<&str> {
    let trimmed = line.trim().trim_start_matches("**");
    TITLE_LABELS.iter().find_map(|label| {
        let head = trimmed.get(..label.len())?;
        head.eq_ignore_ascii_case(label)
            .then(|| trimmed[label.len()..].trim().trim_matches('*').trim())
    })
}

fn looks_like_title(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.starts_with('#') && !trimmed.starts_with('<') && trimmed.chars().count() < MAX_BARE_TITLE_CHARS
}

/// Split raw model output into title and body.
///
/// Precedence:
///
/// 1. The first line carrying a title label (`Title:`, `タイトル：`, ...)
///    becomes the title; every other line is body.
/// 2. Otherwise the first non-empty line becomes the title if it looks like
///    one: not a heading or markup, and shorter than 100 characters. If it
///    does not, there is no title and everything is body.
pub fn parse_draft(raw: &str) -> ParsedDraft {
    let lines: Vec<&str> = raw.lines().collect();

    let labelled = lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| labelled_title(line).filter(|t| !t.is_empty()).map(|t| (i, t)));

    let (title, skip) = match labelled {
        Some((i, title)) => (Some(title.to_string()), Some(i)),
        None => match lines.iter().position(|l| !l.trim().is_empty()) {
            Some(i) if looks_like_title(lines[i]) => (Some(lines[i].trim().to_string()), Some(i)),
            _ => (None, None),
        },
    };

    let body = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    ParsedDraft { title, body }
}

/// Resolve a parsed draft into a final title and HTML body.
///
/// A missing title becomes `fallback_title`. An empty body means the model
/// put everything on the title line, so the raw output is used as the body.
pub fn assemble(raw: &str, parsed: ParsedDraft, fallback_title: &str) -> (String, String) {
    let title = parsed.title.unwrap_or_else(|| fallback_title.to_string());
    let body = if parsed.body.is_empty() {
        raw.trim().to_string()
    } else {
        parsed.body
    };
    (title, wrap_paragraphs(&body))
}

pub struct DraftGenerator<'a, C> {
    completion: &'a C,
    settings: &'a GenerationSettings,
    length: &'a LengthTargets,
    artifacts: &'a Artifacts,
}

impl<'a, C: Completion> DraftGenerator<'a, C> {
    pub fn new(
        completion: &'a C,
        settings: &'a GenerationSettings,
        length: &'a LengthTargets,
        artifacts: &'a Artifacts,
    ) -> Self {
        Self {
            completion,
            settings,
            length,
            artifacts,
        }
    }

    fn prompts(&self) -> Prompts<'a> {
        let settings: &'a GenerationSettings = self.settings;
        Prompts::for_language(&settings.article_language)
    }

    fn system_prompt(&self) -> String {
        self.prompts().system(self.length.min_chars, self.length.target_chars)
    }

    fn user_prompt(&self, source: &TopicSource, avoid: &[String]) -> String {
        match source {
            TopicSource::Digest(digest) => self.prompts().digest(digest, avoid),
            TopicSource::Topic(topic) => self.prompts().topic(topic, Local::now(), avoid),
        }
    }

    fn fallback_title(&self, source: &TopicSource) -> String {
        match source {
            TopicSource::Topic(topic) => topic.clone(),
            TopicSource::Digest(_) => self.settings.default_title.clone(),
        }
    }
}

impl<'a, C: Completion> Drafter for DraftGenerator<'a, C> {
    #[instrument(level = "info", skip_all, fields(avoid = avoid.len()))]
    async fn draft(&self, source: &TopicSource, avoid: &[String]) -> Result<Candidate, CompletionError> {
        let system = self.system_prompt();
        let user = self.user_prompt(source, avoid);
        let raw = self
            .completion
            .complete(&CompletionRequest {
                system: &system,
                user: &user,
                temperature: self.settings.draft_temperature,
                max_tokens: self.length.draft_max_tokens,
            })
            .await?;
        self.artifacts.save("draft_raw.txt", &raw).await;
        debug!(preview = %truncate_for_log(&raw, 200), "Raw draft received");

        let parsed = parse_draft(&raw);
        if parsed.title.is_none() {
            warn!("Draft has no recognisable title line; using fallback title");
        }
        let (title, content) = assemble(&raw, parsed, &self.fallback_title(source));
        info!(%title, chars = plain_text_len(&content), "Draft parsed");

        Ok(Candidate {
            title,
            content,
            theme: source.theme(),
        })
    }

    #[instrument(level = "info", skip_all, fields(title = %candidate.title))]
    async fn extend_if_short(&self, mut candidate: Candidate) -> Candidate {
        let current = plain_text_len(&candidate.content);
        let Some(needed) = self.length.shortfall(current) else {
            debug!(current, "Draft meets the length target");
            return candidate;
        };
        info!(current, needed, minimum = self.length.min_chars, "Draft is short; requesting continuation");

        let system = self.system_prompt();
        let user = self.prompts().continuation(&candidate.content, needed);
        let request = CompletionRequest {
            system: &system,
            user: &user,
            temperature: self.settings.draft_temperature,
            max_tokens: self.length.continuation_max_tokens,
        };

        match self.completion.complete(&request).await {
            Ok(extra) => {
                self.artifacts.save("draft_continuation.txt", &extra).await;
                let extra = wrap_paragraphs(&extra);
                candidate.content = format!("{}\n\n{}", candidate.content, extra);
                info!(chars = plain_text_len(&candidate.content), "Continuation appended");
            }
            Err(e) => warn!(error = %e, "Continuation failed; keeping the shorter draft"),
        }
        candidate
    }
}
