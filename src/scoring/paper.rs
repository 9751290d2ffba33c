// Paper score formula.
//
// A weighted sum of five factors computed from a paper's raw metadata:
//
//   score = 0.35 * citation_velocity
//         + 0.25 * influential_ratio
//         + 0.20 * recency
//         + 0.10 * author_score
//         + 0.10 * category_boost
//
// The function is total. Missing or malformed fields degrade to defaults,
// and a paper with no usable publication date is treated as published "now"
// (one month old, the minimum), which makes it maximally recent.

use chrono::{DateTime, Utc};

use super::clock::{parse_publication_date, whole_days_between};
use crate::db::models::PaperRecord;

/// Placeholder per-field weighting: every field gets the same boost.
pub const CATEGORY_BOOST: f64 = 0.5;

/// Decimal places kept in a final score.
pub const SCORE_DECIMALS: usize = 4;

/// Configurable weights for the paper score formula.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreWeights {
    /// Weight for citations per month (default 0.35)
    pub citation_velocity: f64,
    /// Weight for influential / total citations (default 0.25)
    pub influential_ratio: f64,
    /// Weight for the recency decay (default 0.20)
    pub recency: f64,
    /// Weight for the capped citation-count reputation proxy (default 0.10)
    pub author: f64,
    /// Weight for the category boost (default 0.10)
    pub category: f64,
    /// Value of the category boost factor itself (default `CATEGORY_BOOST`)
    pub category_boost: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            citation_velocity: 0.35,
            influential_ratio: 0.25,
            recency: 0.20,
            author: 0.10,
            category: 0.10,
            category_boost: CATEGORY_BOOST,
        }
    }
}

impl ScoreWeights {
    /// Default weights with a different category boost value.
    pub fn with_category_boost(category_boost: f64) -> Self {
        Self {
            category_boost,
            ..Self::default()
        }
    }
}

/// The five normalized factors behind one paper's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFactors {
    pub months_since_pub: f64,
    pub citation_velocity: f64,
    /// Can exceed 1.0 when the source reports more influential than total citations.
    pub influential_ratio: f64,
    pub recency: f64,
    pub author_score: f64,
    pub category_boost: f64,
}

impl ScoreFactors {
    pub fn compute(paper: &PaperRecord, now: DateTime<Utc>, weights: &ScoreWeights) -> Self {
        let citations = paper.citation_count as f64;
        let influential = paper.influential_citation_count as f64;
        let months_since_pub = months_since_publication(paper.publication_date.as_deref(), now);

        Self {
            months_since_pub,
            citation_velocity: citations / months_since_pub,
            influential_ratio: influential / citations.max(1.0),
            // Smooth decay: halves around the six month mark
            recency: 1.0 / (1.0 + months_since_pub / 6.0),
            author_score: (citations / 100.0).min(1.0),
            category_boost: weights.category_boost,
        }
    }

    /// Weighted sum, unrounded.
    pub fn weighted_sum(&self, weights: &ScoreWeights) -> f64 {
        self.citation_velocity * weights.citation_velocity
            + self.influential_ratio * weights.influential_ratio
            + self.recency * weights.recency
            + self.author_score * weights.author
            + self.category_boost * weights.category
    }
}

/// Months since publication, at least 1.
///
/// Whole days divided by 30. An absent or unparsable date counts as
/// published now, i.e. exactly 1.
pub fn months_since_publication(publication_date: Option<&str>, now: DateTime<Utc>) -> f64 {
    let days = publication_date
        .and_then(parse_publication_date)
        .map(|published| whole_days_between(now, published))
        .unwrap_or(0);
    (days as f64 / 30.0).max(1.0)
}

/// Score one paper, rounded to `SCORE_DECIMALS` places.
pub fn score_paper(paper: &PaperRecord, now: DateTime<Utc>, weights: &ScoreWeights) -> f64 {
    let factors = ScoreFactors::compute(paper, now, weights);
    round_score(factors.weighted_sum(weights))
}

/// Round half-to-even on the exact binary value, like formatting does.
///
/// Going through the decimal string avoids the drift of `(x * 1e4).round()`
/// so ties break identically on every run and platform.
pub fn round_score(value: f64) -> f64 {
    format!("{:.*}", SCORE_DECIMALS, value)
        .parse()
        .unwrap_or(value)
}
