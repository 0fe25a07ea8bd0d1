//! Text analysis shared by indexing and querying
//!
//! Text is lower-cased, split on non-alphanumeric boundaries and stemmed with
//! the Snowball English stemmer. Tokens shorter than two characters and
//! stopwords are dropped, but they still occupy a position, so positions
//! always refer to the raw token stream.

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::sync::OnceLock;

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "me", "more", "most", "my", "myself", "no", "nor", "not", "of", "off", "on", "once",
    "only", "or", "other", "ought", "our", "ours", "ourselves", "out", "over", "own", "same",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

fn stemmer() -> &'static Stemmer {
    static STEMMER: OnceLock<Stemmer> = OnceLock::new();
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

fn stopwords() -> &'static HashSet<&'static str> {
    static STOPWORDS_SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOPWORDS_SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Returns true for words that carry no search meaning
pub fn is_stopword(word: &str) -> bool {
    stopwords().contains(word)
}

/// Splits text into lower-cased words without stemming or filtering
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Tokenizes text into `(term, position)` pairs
///
/// # Examples
///
/// ```
/// use sumi_search::index::tokenize;
///
/// let tokens = tokenize("The Running of the bulls");
/// assert_eq!(tokens, vec![("run".to_string(), 1), ("bull".to_string(), 4)]);
/// ```
pub fn tokenize(text: &str) -> Vec<(String, u32)> {
    words(text)
        .enumerate()
        .filter(|(_, word)| word.chars().count() >= 2 && !is_stopword(word))
        .map(|(position, word)| (stemmer().stem(&word).into_owned(), position as u32))
        .collect()
}

/// Tokenizes a query into distinct terms, keeping first-occurrence order
pub fn query_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .map(|(term, _)| term)
        .filter(|term| seen.insert(term.clone()))
        .collect()
}
