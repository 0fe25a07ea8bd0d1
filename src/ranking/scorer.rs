use crate::index::{Candidate, CorpusStats, Document, Field};
use crate::ranking::RankingWeights;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// Floor of the position bias for terms far from the start of a field
pub const MIN_POSITION_BIAS: f64 = 0.5;

/// Position at which the bias above the floor has decayed by 1/e
pub const POSITION_SCALE: f64 = 50.0;

/// Days over which freshness decays by 1/e
pub const FRESHNESS_DECAY_DAYS: f64 = 30.0;

/// Content length that earns the full length signal
pub const OPTIMAL_CONTENT_LENGTH: f64 = 1500.0;

const CONTENT_LENGTH_SIGMA: f64 = 750.0;

/// Per-signal contributions to a document's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub title: f64,
    pub headings: f64,
    pub meta_description: f64,
    pub content: f64,
    pub url: f64,
    pub freshness: f64,
    pub content_length: f64,
    pub depth: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    /// Contribution of one field
    pub fn field(&self, field: Field) -> f64 {
        match field {
            Field::Title => self.title,
            Field::Headings => self.headings,
            Field::MetaDescription => self.meta_description,
            Field::Content => self.content,
            Field::Url => self.url,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut f64 {
        match field {
            Field::Title => &mut self.title,
            Field::Headings => &mut self.headings,
            Field::MetaDescription => &mut self.meta_description,
            Field::Content => &mut self.content,
            Field::Url => &mut self.url,
        }
    }
}

/// Inverse document frequency, never negative
pub fn idf(total_documents: usize, document_frequency: usize) -> f64 {
    if total_documents == 0 {
        return 0.0;
    }
    let ratio = total_documents as f64 / document_frequency.max(1) as f64;
    ratio.ln().max(0.0)
}

/// Boost for terms near the start of a field, from 1.0 down to the floor
pub fn position_bias(position: u32) -> f64 {
    MIN_POSITION_BIAS + (1.0 - MIN_POSITION_BIAS) * (-(position as f64) / POSITION_SCALE).exp()
}

/// Freshness signal in (0, 1], decaying with the document's age
pub fn freshness(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - fetched_at).num_seconds().max(0) as f64 / 86_400.0;
    (-age_days / FRESHNESS_DECAY_DAYS).exp()
}

/// Content length signal: short and very long pages get a flat low value
pub fn content_length_band(content_length: usize) -> f64 {
    if content_length < 100 {
        0.1
    } else if content_length > 10_000 {
        0.3
    } else {
        let diff = content_length as f64 - OPTIMAL_CONTENT_LENGTH;
        (-(diff * diff) / (2.0 * CONTENT_LENGTH_SIGMA * CONTENT_LENGTH_SIGMA)).exp()
    }
}

/// Scores a candidate against the query terms it matched
///
/// # Arguments
///
/// * `candidate` - The document and its per-field term matches
/// * `stats` - Corpus statistics from the same index snapshot
/// * `weights` - The weights snapshot for this query
/// * `now` - Reference time for freshness
pub fn score(
    candidate: &Candidate,
    stats: &CorpusStats,
    weights: &RankingWeights,
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::default();

    for m in &candidate.matches {
        let df = stats.document_frequency(m.field, &m.term);
        let contribution = m.term_frequency as f64
            * idf(stats.total_documents, df)
            * position_bias(m.first_position);
        *breakdown.field_mut(m.field) += contribution;
    }
    for field in Field::ALL {
        *breakdown.field_mut(field) *= weights.field(field);
    }

    let doc = &candidate.document;
    breakdown.freshness = weights.freshness * freshness(doc.fetched_at, now);
    breakdown.content_length = weights.content_length * content_length_band(doc.content_length);
    breakdown.depth = weights.depth * doc.depth as f64;

    breakdown.total = Field::ALL.iter().map(|f| breakdown.field(*f)).sum::<f64>()
        + breakdown.freshness
        + breakdown.content_length
        + breakdown.depth;

    breakdown
}

/// Result ordering: higher score, then newer fetch, then URL ascending
pub fn compare(a_score: f64, a: &Document, b_score: f64, b: &Document) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| b.fetched_at.cmp(&a.fetched_at))
        .then_with(|| a.url.cmp(&b.url))
}
