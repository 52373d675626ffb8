//! Post history persistence.
//!
//! The history is a JSON array of [`HistoryEntry`] records in a single file
//! (`post_history.json` by default). It is best effort: a missing or corrupt
//! file reads as an empty history, and a failed write is logged and
//! swallowed, so the history can never stop an article from going out.
//!
//! Entries older than [`RETENTION_DAYS`] are evicted on every save.
//!
//! One pipeline instance is assumed to own the file; there is no locking.

use crate::models::{Candidate, HistoryEntry};
use crate::utils::{strip_tags, take_chars};
use chrono::{DateTime, Duration, Local};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

pub const RETENTION_DAYS: i64 = 30;

/// Characters of plain text kept as the content preview.
pub const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read all persisted entries.
    ///
    /// Records that fail to deserialize are skipped individually; anything
    /// that is not a JSON array yields an empty history.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Vec<HistoryEntry> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read post history; treating as empty");
                return Vec::new();
            }
        };

        let records = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(records)) => records,
            Ok(_) => {
                warn!("Post history is not a JSON array; treating as empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Post history is not valid JSON; treating as empty");
                return Vec::new();
            }
        };

        records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<HistoryEntry>(record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable history record");
                    None
                }
            })
            .collect()
    }

    /// Evict expired entries and persist the rest. Returns what was kept.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&self, entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
        let kept = retain_recent(entries, Local::now());

        match serde_json::to_string_pretty(&kept) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&self.path, json).await {
                    warn!(error = %e, "Failed to write post history");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize post history"),
        }
        kept
    }

    /// Append a fingerprint of `candidate` and save.
    pub async fn record(&self, candidate: &Candidate) -> HistoryEntry {
        let entry = fingerprint(candidate, Local::now());
        let mut entries = self.load().await;
        entries.push(entry.clone());
        let kept = self.save(entries).await;
        info!(title = %entry.title, entries = kept.len(), "Recorded post in history");
        entry
    }
}

/// Drop entries dated more than [`RETENTION_DAYS`] before `now`.
pub fn retain_recent(entries: Vec<HistoryEntry>, now: DateTime<Local>) -> Vec<HistoryEntry> {
    let cutoff = now - Duration::days(RETENTION_DAYS);
    entries.into_iter().filter(|e| e.date > cutoff).collect()
}

/// The history record for a candidate.
pub fn fingerprint(candidate: &Candidate, now: DateTime<Local>) -> HistoryEntry {
    HistoryEntry {
        title: candidate.title.clone(),
        date: now,
        theme: candidate.theme.clone(),
        content_preview: take_chars(&strip_tags(&candidate.content), PREVIEW_CHARS),
    }
}
