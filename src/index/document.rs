//! Structured documents produced by the content extractor

use crate::url::document_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use url::Url;

/// The searchable fields of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Headings,
    MetaDescription,
    Content,
    Url,
}

impl Field {
    /// Every field, in indexing order
    pub const ALL: [Field; 5] = [
        Field::Title,
        Field::Headings,
        Field::MetaDescription,
        Field::Content,
        Field::Url,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Headings => "headings",
            Self::MetaDescription => "meta_description",
            Self::Content => "content",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fetched page reduced to its searchable parts
///
/// There is exactly one document per normalized URL; `id` is derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Hex SHA-256 of the normalized URL
    pub id: String,

    /// Normalized URL
    pub url: String,

    pub title: String,

    pub meta_description: String,

    /// h1-h6 text in document order
    pub headings: Vec<String>,

    /// Visible body text
    pub content: String,

    /// Normalized outbound links, deduplicated in first-seen order
    pub outbound_links: Vec<String>,

    /// Link distance from the job's seed URLs
    pub depth: u32,

    pub fetched_at: DateTime<Utc>,

    /// Length of `content` in characters
    pub content_length: usize,
}

impl Document {
    /// Creates an empty document for a normalized URL, fetched now
    pub fn new(url: &Url) -> Self {
        Self {
            id: document_id(url),
            url: url.to_string(),
            title: String::new(),
            meta_description: String::new(),
            headings: Vec::new(),
            content: String::new(),
            outbound_links: Vec::new(),
            depth: 0,
            fetched_at: Utc::now(),
            content_length: 0,
        }
    }

    /// Replaces the body text and keeps `content_length` in step
    pub fn set_content(&mut self, content: String) {
        self.content_length = content.chars().count();
        self.content = content;
    }

    /// Returns the text indexed for a field
    ///
    /// Headings are joined with newlines. The URL field drops the scheme so
    /// "http" and "https" never become terms.
    pub fn field_text(&self, field: Field) -> Cow<'_, str> {
        match field {
            Field::Title => Cow::Borrowed(&self.title),
            Field::Headings => Cow::Owned(self.headings.join("\n")),
            Field::MetaDescription => Cow::Borrowed(&self.meta_description),
            Field::Content => Cow::Borrowed(&self.content),
            Field::Url => Cow::Borrowed(
                self.url
                    .split_once("://")
                    .map(|(_, rest)| rest)
                    .unwrap_or(&self.url),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(&Url::parse("https://a.test/rust/guide?page=2").unwrap())
    }

    #[test]
    fn test_new_document_id_is_stable() {
        let a = doc();
        let b = doc();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 64);
        assert_eq!(a.content_length, 0);
    }

    #[test]
    fn test_set_content_counts_chars() {
        let mut d = doc();
        d.set_content("héllo wörld".to_string());
        assert_eq!(d.content_length, 11);
    }

    #[test]
    fn test_url_field_text_drops_scheme() {
        let d = doc();
        assert_eq!(d.field_text(Field::Url), "a.test/rust/guide?page=2");
    }

    #[test]
    fn test_headings_field_text() {
        let mut d = doc();
        d.headings = vec!["Intro".to_string(), "Usage".to_string()];
        assert_eq!(d.field_text(Field::Headings), "Intro\nUsage");
    }

    #[test]
    fn test_field_names() {
        assert_eq!(Field::MetaDescription.to_string(), "meta_description");
        assert_eq!(Field::ALL.len(), 5);
    }
}
