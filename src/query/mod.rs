//! Query engine
//!
//! Turns free text into ranked results over the shared index. Every search
//! takes one snapshot of the ranking weights, so a concurrent weight update
//! never mixes into a query already in progress. Searched words are recorded
//! and feed query suggestions.

mod snippet;

pub use snippet::{snippet, SNIPPET_CHARS};

use crate::index::{is_stopword, query_terms, words, Field, Indexer};
use crate::ranking::{compare, score, RankingWeights, ScoreBreakdown};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document_id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Answers searches and suggestions against an index
#[derive(Debug)]
pub struct QueryEngine {
    indexer: Arc<Indexer>,
    weights: RwLock<RankingWeights>,
    query_log: Mutex<HashMap<String, u64>>,
}

impl QueryEngine {
    pub fn new(indexer: Arc<Indexer>, weights: RankingWeights) -> Self {
        Self {
            indexer,
            weights: RwLock::new(weights),
            query_log: Mutex::new(HashMap::new()),
        }
    }

    /// Searches the index, returning at most `limit` results
    ///
    /// An empty query, or one made only of stopwords, returns nothing.
    /// Failures inside the index degrade to an empty result list.
    pub fn search(&self, query_text: &str, limit: usize) -> Vec<SearchResult> {
        self.search_at(query_text, limit, Utc::now())
    }

    /// Searches only the given fields; an empty list searches all of them
    pub fn search_fields(&self, query_text: &str, limit: usize, fields: &[Field]) -> Vec<SearchResult> {
        self.search_in(query_text, limit, fields, Utc::now())
    }

    /// Searches with an explicit reference time for freshness
    pub fn search_at(&self, query_text: &str, limit: usize, now: DateTime<Utc>) -> Vec<SearchResult> {
        self.search_in(query_text, limit, &Field::ALL, now)
    }

    fn search_in(
        &self,
        query_text: &str,
        limit: usize,
        fields: &[Field],
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        let fields = if fields.is_empty() { &Field::ALL[..] } else { fields };
        let terms = query_terms(query_text);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let query_words = significant_words(query_text);
        self.record_query(&query_words);

        match self.ranked(&terms, &query_words, fields, limit, now) {
            Ok(results) => {
                tracing::debug!(
                    "Search for '{}' returned {} results",
                    query_text,
                    results.len()
                );
                results
            }
            Err(e) => {
                tracing::warn!("Search for '{}' failed: {}", query_text, e);
                Vec::new()
            }
        }
    }

    fn ranked(
        &self,
        terms: &[String],
        query_words: &[String],
        fields: &[Field],
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<SearchResult>> {
        let weights = self.weights();
        let (candidates, stats) = self.indexer.candidates_in(terms, fields)?;

        let mut scored: Vec<_> = candidates
            .into_iter()
            .map(|candidate| {
                let breakdown = score(&candidate, &stats, &weights, now);
                (candidate.document, breakdown)
            })
            .collect();
        scored.sort_by(|(a, a_score), (b, b_score)| compare(a_score.total, a, b_score.total, b));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(doc, breakdown)| SearchResult {
                document_id: doc.id.clone(),
                url: doc.url.clone(),
                title: doc.title.clone(),
                snippet: snippet(&doc.content, &doc.meta_description, query_words),
                score: breakdown.total,
                breakdown,
            })
            .collect())
    }

    /// Completions for a partial query word, most frequent first
    ///
    /// Candidates are previously searched words and indexed title words that
    /// start with the prefix and are longer than it. A word's frequency is
    /// the number of searches containing it plus the number of titles
    /// containing it.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        if let Ok(log) = self.query_log.lock() {
            for (word, count) in log.iter() {
                if word.starts_with(&prefix) && word.len() > prefix.len() {
                    *counts.entry(word.clone()).or_insert(0) += count;
                }
            }
        }
        match self.indexer.title_words_with_prefix(&prefix) {
            Ok(title_words) => {
                for (word, count) in title_words {
                    *counts.entry(word).or_insert(0) += count as u64;
                }
            }
            Err(e) => tracing::warn!("Title suggestions unavailable: {}", e),
        }

        top_by_count(counts, limit)
    }

    /// Most common title words longer than three characters
    pub fn popular_terms(&self, limit: usize) -> Vec<String> {
        match self.indexer.title_words(3) {
            Ok(title_words) => top_by_count(
                title_words
                    .into_iter()
                    .map(|(word, count)| (word, count as u64))
                    .collect(),
                limit,
            ),
            Err(e) => {
                tracing::warn!("Popular terms unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Current ranking weights
    pub fn weights(&self) -> RankingWeights {
        match self.weights.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Replaces the ranking weights; later queries use the new values
    pub fn set_weights(&self, weights: RankingWeights) -> Result<()> {
        weights.validate()?;
        match self.weights.write() {
            Ok(mut guard) => *guard = weights,
            Err(poisoned) => *poisoned.into_inner() = weights,
        }
        tracing::info!("Ranking weights updated");
        Ok(())
    }

    fn record_query(&self, query_words: &[String]) {
        let Ok(mut log) = self.query_log.lock() else {
            return;
        };
        for word in query_words {
            *log.entry(word.clone()).or_insert(0) += 1;
        }
    }
}

/// Distinct lower-cased query words worth matching and remembering
fn significant_words(query_text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in words(query_text) {
        if word.chars().count() >= 2 && !is_stopword(&word) && !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

fn top_by_count(counts: BTreeMap<String, u64>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<_> = counts.into_iter().collect();
    // Stable sort keeps alphabetical order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}
