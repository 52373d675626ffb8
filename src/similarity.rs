//! Near-duplicate detection over the post history.
//!
//! A candidate title is compared against every stored entry. Rules are tried
//! in order for each entry and the first hit wins:
//!
//! 1. exact title match (case-insensitive, trimmed)
//! 2. title/title token Jaccard similarity above `title_similarity`
//! 3. identical leading `prefix_chars` characters, when both titles are longer
//! 4. title/theme token Jaccard similarity above `theme_similarity`, for themes
//!    longer than `min_theme_chars`
//!
//! False negatives are acceptable. A false positive costs one regeneration.

use crate::config::DuplicateThresholds;
use crate::models::HistoryEntry;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Why a candidate was judged a duplicate.
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateRule {
    ExactTitle,
    SimilarTitle(f64),
    SharedPrefix,
    SimilarTheme(f64),
}

impl fmt::Display for DuplicateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateRule::ExactTitle => write!(f, "exact title"),
            DuplicateRule::SimilarTitle(s) => write!(f, "title similarity {:.0}%", s * 100.0),
            DuplicateRule::SharedPrefix => write!(f, "shared title prefix"),
            DuplicateRule::SimilarTheme(s) => write!(f, "theme similarity {:.0}%", s * 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    pub rule: DuplicateRule,
    /// Title of the history entry that matched.
    pub existing_title: String,
}

/// Jaccard similarity of the lower-cased whitespace token sets.
///
/// Defined as 0.0 when either side has no tokens.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let left: HashSet<&str> = a_lower.split_whitespace().collect();
    let right: HashSet<&str> = b_lower.split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityClassifier {
    thresholds: DuplicateThresholds,
}

impl SimilarityClassifier {
    pub fn new(thresholds: DuplicateThresholds) -> Self {
        Self { thresholds }
    }

    /// Whether `title` duplicates anything in `history`.
    ///
    /// `content` is accepted for callers that have it; the verdict is based on
    /// titles and themes only.
    pub fn is_duplicate(&self, title: &str, content: &str, history: &[HistoryEntry]) -> bool {
        match self.find_duplicate(title, content, history) {
            Some(found) => {
                warn!(rule = %found.rule, existing = %found.existing_title, "Duplicate detected");
                true
            }
            None => false,
        }
    }

    /// First history entry that `title` duplicates, with the rule that fired.
    pub fn find_duplicate(
        &self,
        title: &str,
        _content: &str,
        history: &[HistoryEntry],
    ) -> Option<DuplicateMatch> {
        let title = title.trim().to_lowercase();
        history.iter().find_map(|entry| {
            self.match_entry(&title, entry).map(|rule| DuplicateMatch {
                rule,
                existing_title: entry.title.clone(),
            })
        })
    }

    fn match_entry(&self, title: &str, entry: &HistoryEntry) -> Option<DuplicateRule> {
        let t = &self.thresholds;
        let existing = entry.title.trim().to_lowercase();
        let theme = entry.theme.trim().to_lowercase();

        if title == existing {
            return Some(DuplicateRule::ExactTitle);
        }

        let similarity = jaccard(title, &existing);
        if similarity > t.title_similarity {
            return Some(DuplicateRule::SimilarTitle(similarity));
        }

        if title.chars().count() > t.prefix_chars
            && existing.chars().count() > t.prefix_chars
            && title.chars().take(t.prefix_chars).eq(existing.chars().take(t.prefix_chars))
        {
            return Some(DuplicateRule::SharedPrefix);
        }

        if theme.chars().count() > t.min_theme_chars {
            let theme_similarity = jaccard(title, &theme);
            if theme_similarity > t.theme_similarity {
                return Some(DuplicateRule::SimilarTheme(theme_similarity));
            }
        }

        debug!(existing = %existing, similarity, "No match against history entry");
        None
    }
}
