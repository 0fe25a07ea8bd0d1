//! URL handling module for Sumi-Search
//!
//! This module provides URL normalization, host extraction for politeness
//! bookkeeping, document identity, and domain scope matching.

mod domain;
mod normalize;
mod scope;

use sha2::{Digest, Sha256};
use url::Url;

pub use domain::{extract_domain, host_key};
pub use normalize::{normalize_str, normalize_url};
pub use scope::{matches_wildcard, DomainScope};

/// Derives the stable document id for a normalized URL
///
/// The id is the hex-encoded SHA-256 digest of the normalized URL string, so
/// every spelling of the same page maps to the same document.
///
/// # Examples
///
/// ```
/// use sumi_search::url::{document_id, normalize_url};
///
/// let a = normalize_url("https://Example.com/a/#x").unwrap();
/// let b = normalize_url("https://example.com/a").unwrap();
/// assert_eq!(document_id(&a), document_id(&b));
/// assert_eq!(document_id(&a).len(), 64);
/// ```
pub fn document_id(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
