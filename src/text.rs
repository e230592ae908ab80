//! Body text cleaning applied before every vector-store write.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>?").expect("valid tag regex"));
static ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\\(r|n|"|')"#).expect("valid escape regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Turn an HTML body into plain text suitable for embedding.
///
/// Entities are decoded first, so encoded markup (`&lt;p&gt;`) is stripped
/// along with literal tags. Literal two-character escape sequences left over
/// from double-encoded JSON (`\n`, `\r`, `\"`, `\'`) are removed, then
/// whitespace runs collapse to a single space.
pub fn clean_body_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let decoded = html_escape::decode_html_entities(text);
    let cleaned = TAG_RE.replace_all(&decoded, "");
    let cleaned = ESCAPE_RE.replace_all(&cleaned, "");
    let cleaned = WS_RE.replace_all(&cleaned, " ");

    cleaned.trim().to_string()
}
