//! Standalone HTML preview of an article.

use crate::models::GeneratedArticle;

/// Escape text for use in HTML content and attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a full page. `image_file` is a path relative to the page.
///
/// The article body is already HTML and is embedded as is.
pub fn render(article: &GeneratedArticle, image_file: Option<&str>) -> String {
    let title = escape(&article.title);
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n<article>\n"));
    page.push_str(&format!("<h1>{title}</h1>\n"));
    if let Some(file) = image_file {
        page.push_str(&format!("<img src=\"{}\" alt=\"{title}\">\n", escape(file)));
    }
    page.push_str(&article.content);
    page.push_str("\n</article>\n</body>\n</html>\n");
    page
}
