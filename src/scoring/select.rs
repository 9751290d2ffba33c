// Selection — turns a scored batch into the papers a reader actually gets.
//
// Three modes: global top-N, top-K per field merged back into one ranking,
// and personalized top-N for a subscriber's preferred fields. Every sort is
// stable and descending by score, so ties keep their input order and a
// selection never contains a paper twice or a paper that wasn't in the batch.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::paper::{score_paper, ScoreWeights};
use super::reason::selection_reason;
use crate::db::models::{Field, PaperRecord, ScoredPaper, SubscriberPreference};

fn by_score_desc(a: &ScoredPaper, b: &ScoredPaper) -> Ordering {
    b.score.total_cmp(&a.score)
}

/// Score every paper and sort descending. Ties keep input order.
pub fn score_papers(
    papers: &[PaperRecord],
    now: DateTime<Utc>,
    weights: &ScoreWeights,
) -> Vec<ScoredPaper> {
    let mut scored: Vec<ScoredPaper> = papers
        .iter()
        .map(|paper| ScoredPaper {
            paper: paper.clone(),
            score: score_paper(paper, now, weights),
            selection_reason: None,
        })
        .collect();
    scored.sort_by(by_score_desc);
    scored
}

/// The `n` highest-scoring papers of the batch. Fewer when the batch is smaller.
pub fn top_n(
    papers: &[PaperRecord],
    n: usize,
    now: DateTime<Utc>,
    weights: &ScoreWeights,
) -> Vec<ScoredPaper> {
    if n == 0 {
        return Vec::new();
    }
    let mut scored = score_papers(papers, now, weights);
    scored.truncate(n);
    scored
}

/// Top `k` papers of every field, merged and re-ranked by score.
///
/// Fields are visited in the order they first appear in the batch, which is
/// what decides the order of equal-score papers from different fields.
pub fn top_per_field(
    papers: &[PaperRecord],
    k: usize,
    now: DateTime<Utc>,
    weights: &ScoreWeights,
) -> Vec<ScoredPaper> {
    if k == 0 {
        return Vec::new();
    }

    let mut partitions: Vec<(Field, Vec<PaperRecord>)> = Vec::new();
    for paper in papers {
        match partitions.iter_mut().find(|(field, _)| *field == paper.field) {
            Some((_, members)) => members.push(paper.clone()),
            None => partitions.push((paper.field, vec![paper.clone()])),
        }
    }

    let mut merged: Vec<ScoredPaper> = partitions
        .iter()
        .flat_map(|(_, members)| top_n(members, k, now, weights))
        .collect();
    merged.sort_by(by_score_desc);
    merged
}

/// Top `n` of an already-scored batch for one subscriber.
///
/// No preference means the global top-N. With a preference, only papers in
/// a preferred field are eligible, and when none are the result is empty:
/// the caller skips that subscriber instead of sending unrelated papers.
pub fn personalized_top_n(
    scored: &[ScoredPaper],
    preference: &SubscriberPreference,
    n: usize,
) -> Vec<ScoredPaper> {
    let mut eligible: Vec<ScoredPaper> = scored
        .iter()
        .filter(|sp| preference.is_empty() || preference.matches(sp.paper.field))
        .cloned()
        .collect();
    // The input is usually sorted already; sorting again keeps this correct
    // for callers that filtered or concatenated batches.
    eligible.sort_by(by_score_desc);
    eligible.truncate(n);
    eligible
}

/// Fill in the selection reason of every selected paper.
pub fn attach_reasons(selected: &mut [ScoredPaper], now: DateTime<Utc>) {
    for sp in selected.iter_mut() {
        sp.selection_reason = Some(selection_reason(&sp.paper, now));
    }
}

/// Global top-N with reasons attached.
pub fn top_n_with_reasons(
    papers: &[PaperRecord],
    n: usize,
    now: DateTime<Utc>,
    weights: &ScoreWeights,
) -> Vec<ScoredPaper> {
    let mut selected = top_n(papers, n, now, weights);
    attach_reasons(&mut selected, now);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::clock::{Clock, FixedClock};

    fn paper(id: &str, field: Field, citations: u64) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {id}"),
            abstract_text: None,
            authors: vec![],
            citation_count: citations,
            influential_citation_count: 0,
            publication_date: None,
            field,
            url: None,
        }
    }

    fn now() -> DateTime<Utc> {
        FixedClock::at_date(2026, 3, 1).unwrap().now()
    }

    fn ids(selected: &[ScoredPaper]) -> Vec<&str> {
        selected.iter().map(|sp| sp.paper.id.as_str()).collect()
    }

    #[test]
    fn test_top_n_zero_is_empty() {
        let papers = vec![paper("a", Field::Cs, 3)];
        assert!(top_n(&papers, 0, now(), &ScoreWeights::default()).is_empty());
    }

    #[test]
    fn test_top_n_empty_batch() {
        assert!(top_n(&[], 3, now(), &ScoreWeights::default()).is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let papers = vec![
            paper("first", Field::Cs, 4),
            paper("high", Field::Math, 9),
            paper("second", Field::Bio, 4),
        ];
        let ranked = score_papers(&papers, now(), &ScoreWeights::default());
        assert_eq!(ids(&ranked), vec!["high", "first", "second"]);
    }

    #[test]
    fn test_per_field_merges_by_score() {
        let papers = vec![
            paper("B", Field::Cs, 5),
            paper("C", Field::Bio, 7),
            paper("A", Field::Cs, 9),
        ];
        let selected = top_per_field(&papers, 1, now(), &ScoreWeights::default());
        assert_eq!(ids(&selected), vec!["A", "C"]);
    }

    #[test]
    fn test_attach_reasons_fills_every_entry() {
        let papers = vec![paper("a", Field::Cs, 0), paper("b", Field::Cs, 80)];
        let selected = top_n_with_reasons(&papers, 5, now(), &ScoreWeights::default());
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|sp| sp.selection_reason.is_some()));
    }
}
