//! Text helpers shared by the generator, the history store and the outputs.
//!
//! - Markup stripping and plain-text length for the length-repair pass
//! - Paragraph wrapping for model output that arrives without markup
//! - String truncation for logging and fingerprints
//! - Slugification for output file names

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Remove anything that looks like a markup tag.
///
/// Entities are left untouched; this is what the length thresholds are
/// calibrated against.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// Number of characters (not bytes) of visible text in an HTML body.
pub fn plain_text_len(html: &str) -> usize {
    strip_tags(html).trim().chars().count()
}

/// Visible text of an HTML fragment with entities decoded and whitespace collapsed.
///
/// Used for feed descriptions, which frequently carry escaped markup and
/// `&nbsp;`-style entities.
pub fn html_to_text(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    doc.root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a body already starts with markup.
pub fn starts_with_markup(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

/// Wrap each blank-line-delimited block of plain text in `<p>` tags.
///
/// Bodies that already start with a tag are returned unchanged.
pub fn wrap_paragraphs(body: &str) -> String {
    if starts_with_markup(body) {
        return body.trim().to_string();
    }
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{p}</p>"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First `max` characters of a string.
pub fn take_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and a count of
/// the dropped bytes appended.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Convert a title to a file-name friendly slug.
///
/// Lowercases, drops punctuation, turns spaces into hyphens. Non-ASCII
/// letters survive, so Japanese titles stay readable.
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello <strong>world</strong></p>"), "Hello world");
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    #[test]
    fn test_plain_text_len_counts_chars() {
        assert_eq!(plain_text_len("<p>日本語</p>"), 3);
        assert_eq!(plain_text_len("  <h2>ab</h2>\n<p>cd</p>  "), 5);
    }

    #[test]
    fn test_html_to_text_decodes_entities() {
        assert_eq!(html_to_text("<p>GPT&nbsp;5 &amp; friends</p>"), "GPT 5 & friends");
        assert_eq!(html_to_text("plain   text\n here"), "plain text here");
    }

    #[test]
    fn test_wrap_paragraphs() {
        assert_eq!(
            wrap_paragraphs("first\nline\n\nsecond\n\n\n"),
            "<p>first\nline</p>\n\n<p>second</p>"
        );
        assert_eq!(wrap_paragraphs("<h2>x</h2>\n<p>y</p>"), "<h2>x</h2>\n<p>y</p>");
        assert_eq!(wrap_paragraphs(""), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("ああああ", 2);
        assert!(result.starts_with("ああ…"));
    }

    #[test]
    fn test_take_chars() {
        assert_eq!(take_chars("こんにちは", 2), "こん");
        assert_eq!(take_chars("ab", 10), "ab");
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify_title("Hello World"), "hello-world");
        assert_eq!(slugify_title("GPT-4o: What's New?"), "gpt-4o-whats-new");
        assert_eq!(slugify_title("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify_title("AI検索エンジン 比較"), "ai検索エンジン-比較");
    }
}
