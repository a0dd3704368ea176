//! Pure helpers that derive post metadata from feed HTML.

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use once_cell::sync::Lazy;
use regex::Regex;

pub const WORDS_PER_MINUTE: u32 = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 160;
const ELLIPSIS: &str = "...";

static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"'>]+)["']"#).expect("img src pattern")
});
static IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:jpe?g|png|gif|webp|svg)(?:\?.*)?$").expect("image url pattern")
});
static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").expect("paragraph pattern"));
static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

static DESCRIPTION_SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(|| {
    let mut builder = AmmoniaBuilder::empty();
    builder
        .tags(HashSet::from(["p", "br", "b", "i", "strong", "em"]))
        .clean_content_tags(HashSet::from(["script", "style"]));
    builder
});

/// Whitespace-separated tokens in the raw content.
pub fn word_count(content: &str) -> u32 {
    u32::try_from(content.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// Minutes needed to read `words` at [`WORDS_PER_MINUTE`], rounded up, never below one.
pub fn reading_time(words: u32) -> u32 {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// First `<img src>` in the content, if any.
pub fn first_image_src(content: &str) -> Option<String> {
    IMG_SRC
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|src| src.as_str().trim().to_string())
        .filter(|src| !src.is_empty())
}

/// Whether the URL path ends in a known image extension, optionally followed by a query.
pub fn is_image_url(url: &str) -> bool {
    IMAGE_URL.is_match(url)
}

/// Pick the post thumbnail: the feed's own field wins over the first inline
/// image. Whatever is chosen must look like an image file or it is dropped.
pub fn select_thumbnail(feed_thumbnail: Option<&str>, content: &str) -> String {
    let candidate = feed_thumbnail
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| first_image_src(content));

    match candidate {
        Some(url) if is_image_url(&url) => url,
        _ => String::new(),
    }
}

/// Short description for listings and meta tags.
///
/// The feed's description wins when present. Otherwise the content is
/// sanitized down to a few inline tags and the first paragraph is used,
/// even when it is empty, truncated to [`DESCRIPTION_MAX_CHARS`] with an ellipsis. Content
/// without paragraphs falls back to its leading text.
pub fn derive_description(feed_description: Option<&str>, content: &str) -> String {
    if let Some(description) = feed_description
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return description.to_string();
    }

    let sanitized = DESCRIPTION_SANITIZER.clean(content).to_string();

    let paragraph = PARAGRAPH
        .captures(&sanitized)
        .and_then(|captures| captures.get(1))
        .map(|inner| plain_text(inner.as_str()));

    match paragraph {
        Some(text) => truncate_with_ellipsis(&text, DESCRIPTION_MAX_CHARS),
        None => plain_text(&sanitized)
            .chars()
            .take(DESCRIPTION_MAX_CHARS)
            .collect(),
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when anything was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

fn plain_text(html: &str) -> String {
    let spaced = LINE_BREAK.replace_all(html, " ");
    let without_tags = TAG.replace_all(&spaced, "");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

// ammonia re-encodes text nodes; undo the handful of entities it emits.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
