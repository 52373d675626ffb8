//! Data models shared across the pipeline.
//!
//! - [`HistoryEntry`]: persisted fingerprint of a published article
//! - [`Candidate`]: a generated title/body pair awaiting the duplicate check
//! - [`NewsItem`]: one headline gathered by the news sources
//! - [`ImageArtifact`]: a downloaded header image on local disk
//! - [`GeneratedArticle`]: what [`crate::pipeline::Pipeline::generate_article`] hands back

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fingerprint of a previously published article.
///
/// Serialized as one record of the `post_history.json` array:
///
/// ```json
/// {"title": "...", "date": "2025-05-06T09:00:00.123+09:00", "theme": "...", "content_preview": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub title: String,
    #[serde(with = "iso_date")]
    pub date: DateTime<Local>,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub content_preview: String,
}

/// ISO-8601 timestamps.
///
/// Written as RFC 3339 with the local offset. Reading also accepts naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` stamps, interpreted as local time, which is
/// what older history files contain.
mod iso_date {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(date: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Local));
        }
        let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| D::Error::custom(format!("invalid date '{raw}': {e}")))?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| D::Error::custom(format!("non-existent local time '{raw}'")))
    }
}

/// A generated article that has not been accepted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    /// HTML body.
    pub content: String,
    /// What the article was generated from, recorded in history for theme matching.
    pub theme: String,
}

/// A single news headline.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub source: String,
    pub headline: String,
    pub blurb: String,
    pub link: String,
}

/// A header image downloaded to a temporary file.
///
/// Whoever receives this owns `local_path` and is expected to delete it once
/// the image has been consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArtifact {
    /// Remote URL, or a `file://` URI when the image arrived inline.
    pub source_url: String,
    pub local_path: PathBuf,
}

/// The finished article.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_history_entry_reads_naive_timestamp() {
        let json = r#"{
            "title": "AI News Today",
            "date": "2024-12-01T09:30:15.123456",
            "theme": "GPT-4o features",
            "content_preview": "preview"
        }"#;

        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.title, "AI News Today");
        assert_eq!(entry.date.year(), 2024);
        assert_eq!(entry.date.hour(), 9);
        assert_eq!(entry.date.minute(), 30);
    }

    #[test]
    fn test_history_entry_reads_rfc3339() {
        let json = r#"{"title": "t", "date": "2025-05-06T09:00:00+00:00", "theme": "", "content_preview": ""}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.date.with_timezone(&chrono::Utc).hour(), 9);
    }

    #[test]
    fn test_history_entry_missing_optional_fields() {
        let json = r#"{"date": "2025-05-06T09:00:00"}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert!(entry.title.is_empty());
        assert!(entry.theme.is_empty());
    }

    #[test]
    fn test_history_entry_rejects_garbage_date() {
        let json = r#"{"title": "t", "date": "yesterday"}"#;
        assert!(serde_json::from_str::<HistoryEntry>(json).is_err());
    }

    #[test]
    fn test_history_entry_serialization_keeps_fields() {
        let entry = HistoryEntry {
            title: "Title".into(),
            date: Local::now(),
            theme: "Theme".into(),
            content_preview: "Preview".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        for key in ["title", "date", "theme", "content_preview"] {
            assert!(keys.contains(&key.to_string()));
        }
    }

    #[test]
    fn test_generated_article_skips_missing_image() {
        let article = GeneratedArticle {
            title: "t".into(),
            content: "<p>c</p>".into(),
            image_path: None,
            image_url: None,
        };
        let json = serde_json::to_string(&article).unwrap();
        assert!(!json.contains("image_path"));
        assert!(!json.contains("image_url"));
    }
}
