//! Content extraction from fetched HTML
//!
//! Turns a page body into a `Document`: title, meta description, headings,
//! visible text and outbound links.

use crate::index::Document;
use crate::url::normalize_url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Elements whose text never counts as visible page content
const EXCLUDED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "head",
];

/// Errors produced while extracting a document
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Content of {0} is not HTML")]
    NotHtml(String),
}

/// Extracts a document from an HTML page
///
/// Malformed markup degrades gracefully: a missing title or description is an
/// empty string. Only bodies with no markup at all, or binary bodies, are
/// rejected.
///
/// # Arguments
///
/// * `url` - The normalized URL the body was fetched from
/// * `body` - The page body
///
/// # Returns
///
/// * `Ok(Document)` - The extracted document at depth 0, fetched now
/// * `Err(ExtractionError::NotHtml)` - The body is not markup
///
/// # Example
///
/// ```
/// use sumi_search::crawler::extract;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let url = Url::parse("https://example.com/").unwrap();
/// let doc = extract(&url, html).unwrap();
/// assert_eq!(doc.title, "Test");
/// assert_eq!(doc.outbound_links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn extract(url: &Url, body: &str) -> Result<Document, ExtractionError> {
    if !looks_like_markup(body) {
        return Err(ExtractionError::NotHtml(url.to_string()));
    }

    let html = Html::parse_document(body);
    let mut document = Document::new(url);

    document.title = extract_title(&html);
    document.meta_description = extract_meta_description(&html);
    document.headings = extract_headings(&html);
    document.set_content(extract_visible_text(&html));
    document.outbound_links = extract_links(&html, url);

    Ok(document)
}

fn looks_like_markup(body: &str) -> bool {
    if body.contains('\0') {
        return false;
    }
    body.match_indices('<').any(|(i, _)| {
        body[i + 1..]
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '!' || c == '/')
    })
}

/// Joins whitespace runs into single spaces and trims the ends
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn extract_title(html: &Html) -> String {
    let Some(title_selector) = selector("title") else {
        return String::new();
    };

    html.select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .unwrap_or_default()
}

/// Reads `<meta name="description">`, falling back to `og:description`
fn extract_meta_description(html: &Html) -> String {
    let Some(meta_selector) = selector("meta[content]") else {
        return String::new();
    };

    let mut og_description = None;
    for element in html.select(&meta_selector) {
        let attrs = element.value();
        let content = attrs.attr("content").unwrap_or("");

        if attrs
            .attr("name")
            .map_or(false, |n| n.eq_ignore_ascii_case("description"))
        {
            return collapse_whitespace(content);
        }
        if og_description.is_none()
            && attrs
                .attr("property")
                .map_or(false, |p| p.eq_ignore_ascii_case("og:description"))
        {
            og_description = Some(collapse_whitespace(content));
        }
    }

    og_description.unwrap_or_default()
}

fn extract_headings(html: &Html) -> Vec<String> {
    let Some(heading_selector) = selector("h1, h2, h3, h4, h5, h6") else {
        return Vec::new();
    };

    html.select(&heading_selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

fn extract_visible_text(html: &Html) -> String {
    let root = selector("body")
        .and_then(|body| html.select(&body).next())
        .unwrap_or_else(|| html.root_element());

    // Depth-first walk with an explicit stack; nesting depth is unbounded
    let mut text = String::new();
    let mut pending: Vec<_> = root.children().rev().collect();
    while let Some(node) = pending.pop() {
        if let Some(fragment) = node.value().as_text() {
            text.push_str(fragment);
            text.push(' ');
        } else if let Some(element) = ElementRef::wrap(node) {
            if !EXCLUDED_ELEMENTS.contains(&element.value().name()) {
                pending.extend(node.children().rev());
            }
        }
    }
    collapse_whitespace(&text)
}

/// Collects normalized anchor targets, deduplicated in first-seen order
fn extract_links(html: &Html, base_url: &Url) -> Vec<String> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in html.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_link(href, base_url) else {
            continue;
        };

        if let Ok(normalized) = normalize_url(absolute.as_str()) {
            let normalized = normalized.to_string();
            if seen.insert(normalized.clone()) {
                links.push(normalized);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}
