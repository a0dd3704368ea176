use serde::{Deserialize, Deserializer, Serialize};
use time::{
    OffsetDateTime, PrimitiveDateTime,
    format_description::well_known::{Rfc2822, Rfc3339},
    macros::format_description,
};

/// Envelope returned by the feed-to-JSON proxy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFeedResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub message: Option<String>,
    pub feed: Option<RawFeedMeta>,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<RawFeedItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFeedMeta {
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub link: String,
}

/// One entry of the upstream feed, prior to normalization.
///
/// Nothing about the proxy output is trusted: every field is optional on the
/// wire and missing or `null` values fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawFeedItem {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pub_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(deserialize_with = "null_as_default")]
    pub guid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(deserialize_with = "lenient_enclosure")]
    pub enclosure: Option<RawEnclosure>,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawEnclosure {
    pub link: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub length: Option<u64>,
}

/// Canonical, application-facing post derived from a [`RawFeedItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub description: String,
    pub link: String,
    pub author: String,
    pub pub_date: String,
    pub reading_time: u32,
    pub word_count: u32,
    pub thumbnail: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub claps: u32,
    pub responses: u32,
}

impl Post {
    /// Number of this post's categories that `other` also carries.
    pub fn shared_categories(&self, other: &Post) -> usize {
        self.categories
            .iter()
            .filter(|category| other.categories.contains(category))
            .count()
    }

    /// Publish date parsed from the source string, when it is in a known format.
    pub fn published_at(&self) -> Option<OffsetDateTime> {
        parse_pub_date(&self.pub_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Always => "always",
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
            ChangeFrequency::Yearly => "yearly",
            ChangeFrequency::Never => "never",
        }
    }
}

/// Sitemap projection of a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub slug: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

/// Parse the proxy's publish date.
///
/// The proxy emits `YYYY-MM-DD HH:MM:SS` in UTC; RFC 3339 and RFC 2822 are
/// accepted too since raw feeds use them.
pub fn parse_pub_date(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let proxy_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(primitive) = PrimitiveDateTime::parse(value, proxy_format) {
        return Some(primitive.assume_utc());
    }

    OffsetDateTime::parse(value, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(value, &Rfc2822))
        .ok()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// The proxy emits `{}` or `[]` for missing enclosures. An enclosure without a
// link carries nothing usable.
fn lenient_enclosure<'de, D>(deserializer: D) -> Result<Option<RawEnclosure>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .filter(serde_json::Value::is_object)
        .and_then(|value| serde_json::from_value::<RawEnclosure>(value).ok())
        .filter(|enclosure| !enclosure.link.trim().is_empty()))
}
