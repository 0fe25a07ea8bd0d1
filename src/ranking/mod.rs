//! Multi-factor ranking
//!
//! A document's score sums weighted per-field tf-idf (with a bias toward
//! early positions), freshness, a content-length band and a depth term.
//! Weights are applied at query time only.

mod scorer;
mod weights;

pub use scorer::{
    compare, content_length_band, freshness, idf, position_bias, score, ScoreBreakdown,
    FRESHNESS_DECAY_DAYS, MIN_POSITION_BIAS, OPTIMAL_CONTENT_LENGTH, POSITION_SCALE,
};
pub use weights::RankingWeights;
