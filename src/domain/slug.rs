//! Utilities for turning post titles into URL slugs.
//!
//! Punctuation is dropped outright (so "Don't" becomes `dont`, not `don-t`),
//! then the `slug` crate handles transliteration, lowercasing and hyphen
//! collapsing. The result only ever contains `[a-z0-9-]`, never starts or
//! ends with a hyphen and never repeats one.

use std::{collections::HashSet, str::FromStr};

use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;

const GUID_SUFFIX_LEN: usize = 6;
const FALLBACK_SLUG: &str = "post";

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let filtered: String = input
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || *ch == '-' || *ch == '_')
        .collect();
    let candidate = slugify(filtered);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Derive a slug, falling back to `post-<guid hash>` for titles that have no
/// representable characters.
pub fn slug_or_fallback(title: &str, guid: &str) -> String {
    derive_slug(title).unwrap_or_else(|_| format!("{FALLBACK_SLUG}-{}", guid_suffix(guid)))
}

/// Short, stable hex digest of a feed guid.
pub fn guid_suffix(guid: &str) -> String {
    let digest = Sha256::digest(guid.as_bytes());
    let mut encoded = hex::encode(&digest[..]);
    encoded.truncate(GUID_SUFFIX_LEN);
    encoded
}

/// Hands out slugs that are unique within one collection.
///
/// The first claimant keeps the bare slug; later claimants get the guid hash
/// appended, plus a counter if two items share a guid as well.
#[derive(Default, Debug)]
pub struct SlugRegistry {
    claimed: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self {
            claimed: HashSet::new(),
        }
    }

    pub fn claim(&mut self, slug: &str, guid: &str) -> String {
        if self.claimed.insert(slug.to_string()) {
            return slug.to_string();
        }

        let base = format!("{slug}-{}", guid_suffix(guid));
        let mut candidate = base.clone();
        let mut attempt = 2;
        while !self.claimed.insert(candidate.clone()) {
            candidate = format!("{base}-{attempt}");
            attempt += 1;
        }
        candidate
    }
}

/// How a collection handles two posts whose titles produce the same slug.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlugCollisionPolicy {
    /// Leave duplicates untouched; slug lookups resolve to the first post.
    #[default]
    Keep,
    /// Append the guid hash to every later duplicate.
    Suffix,
}

impl SlugCollisionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Suffix => "suffix",
        }
    }
}

impl FromStr for SlugCollisionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "suffix" => Ok(Self::Suffix),
            other => Err(format!("unknown slug collision policy `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_slug_shape(slug: &str) {
        assert!(!slug.is_empty(), "empty slug");
        assert!(
            slug.chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-'),
            "unexpected character in `{slug}`"
        );
        assert!(!slug.starts_with('-') && !slug.ends_with('-'), "edge hyphen in `{slug}`");
        assert!(!slug.contains("--"), "double hyphen in `{slug}`");
    }

    #[test]
    fn derive_slug_matches_simple_titles() {
        assert_eq!(
            derive_slug("Open Banking en Colombia").expect("slug"),
            "open-banking-en-colombia"
        );
    }

    #[test]
    fn derive_slug_drops_punctuation_instead_of_splitting() {
        assert_eq!(derive_slug("Don't Panic!").expect("slug"), "dont-panic");
        assert_eq!(derive_slug("C++ & Rust: 2024").expect("slug"), "c-rust-2024");
    }

    #[test]
    fn derive_slug_transliterates_accents() {
        assert_eq!(
            derive_slug("Educación Financiera en América").expect("slug"),
            "educacion-financiera-en-america"
        );
    }

    #[test]
    fn derive_slug_has_expected_shape() {
        let titles = [
            "  Leading and trailing  ",
            "--dashes--everywhere--",
            "snake_case_title",
            "Tabs\tand\nnewlines",
            "Ünïcödé — quotes “here”",
            "100% Legit (really)",
            "a - b - c",
        ];
        for title in titles {
            let slug = derive_slug(title).expect("slug");
            assert_slug_shape(&slug);
        }
    }

    #[test]
    fn derive_slug_rejects_empty_and_unrepresentable() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
        assert_eq!(
            derive_slug("!!!"),
            Err(SlugError::Unrepresentable {
                input: "!!!".to_string()
            })
        );
    }

    #[test]
    fn fallback_uses_guid_hash() {
        let slug = slug_or_fallback("???", "guid-1");
        assert!(slug.starts_with("post-"));
        assert_eq!(slug.len(), "post-".len() + GUID_SUFFIX_LEN);
        assert_eq!(slug, slug_or_fallback("???", "guid-1"));
    }

    #[test]
    fn registry_suffixes_duplicates() {
        let mut registry = SlugRegistry::new();

        let first = registry.claim("hello", "a");
        let second = registry.claim("hello", "b");
        let third = registry.claim("hello", "b");

        assert_eq!(first, "hello");
        assert_eq!(second, format!("hello-{}", guid_suffix("b")));
        assert_eq!(third, format!("hello-{}-2", guid_suffix("b")));
    }

    #[test]
    fn collision_policy_parses_case_insensitively() {
        assert_eq!(" Keep ".parse::<SlugCollisionPolicy>(), Ok(SlugCollisionPolicy::Keep));
        assert_eq!("SUFFIX".parse::<SlugCollisionPolicy>(), Ok(SlugCollisionPolicy::Suffix));
        assert!("rename".parse::<SlugCollisionPolicy>().is_err());
        assert_eq!(SlugCollisionPolicy::default().as_str(), "keep");
    }
}
