//! Result snippets

/// Length of a snippet in characters, excluding ellipses
pub const SNIPPET_CHARS: usize = 200;

/// Characters of context kept before the first match
const LEADING_CONTEXT: usize = 60;

const ELLIPSIS: &str = "...";

/// Builds a snippet for a document
///
/// Takes a window of `content` around the first word that starts with one of
/// `query_words`. Without a match the meta description is used, then the
/// leading content. An ellipsis marks each truncated end.
///
/// # Examples
///
/// ```
/// use sumi_search::query::snippet;
///
/// let s = snippet("Learn about ferris the crab.", "", &["ferris".to_string()]);
/// assert_eq!(s, "Learn about ferris the crab.");
///
/// let s = snippet("", "A short description", &["missing".to_string()]);
/// assert_eq!(s, "A short description");
/// ```
pub fn snippet(content: &str, meta_description: &str, query_words: &[String]) -> String {
    if let Some(start) = first_match(content, query_words) {
        let before = content[..start].chars().count();
        return window(content, before.saturating_sub(LEADING_CONTEXT));
    }

    if !meta_description.trim().is_empty() {
        return window(meta_description.trim(), 0);
    }
    window(content, 0)
}

/// Byte offset of the first word starting with any of `query_words`
fn first_match(content: &str, query_words: &[String]) -> Option<usize> {
    if query_words.is_empty() {
        return None;
    }

    let mut word_start: Option<usize> = None;
    for (offset, c) in content.char_indices().chain(std::iter::once((content.len(), ' '))) {
        if c.is_alphanumeric() {
            word_start.get_or_insert(offset);
            continue;
        }
        if let Some(start) = word_start.take() {
            let word = content[start..offset].to_lowercase();
            if query_words.iter().any(|q| word.starts_with(q.as_str())) {
                return Some(start);
            }
        }
    }
    None
}

/// `SNIPPET_CHARS` characters of `text` starting at character `start`
fn window(text: &str, start: usize) -> String {
    let mut chars = text.chars().skip(start);
    let body: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    let truncated_end = chars.next().is_some();

    let mut out = String::with_capacity(body.len() + 2 * ELLIPSIS.len());
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(body.trim());
    if truncated_end {
        out.push_str(ELLIPSIS);
    }
    out
}
