// Digest pipeline: score the current batch once, then build and deliver a
// personalized digest for every active subscriber.
//
// Steps:
// 1. Load papers fetched within the lookback window
// 2. Score and rank them (refreshing the display score cache)
// 3. Per subscriber: drop papers sent recently, select by preference,
//    attach reasons. Nothing eligible means the subscriber is skipped.
// 4. Summarize every selected paper once, shared across subscribers
// 5. Deliver, then record what was sent (unless this is a dry run)
//
// Every window is measured from the run's `now`, never the wall clock. A
// storage or delivery failure for one subscriber is logged and counted as
// failed; the rest of the run carries on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::db::models::{PaperRecord, ScoredPaper, Subscriber};
use crate::db::Database;
use crate::delivery::traits::{DeliveryReport, Digest, DigestEntry, DigestSender};
use crate::scoring::clock::days_before;
use crate::scoring::paper::ScoreWeights;
use crate::scoring::select;
use crate::summary::traits::{Summarizer, SUMMARY_UNAVAILABLE};

/// Knobs for one digest run.
#[derive(Debug, Clone)]
pub struct DigestOptions {
    pub top_n: usize,
    pub lookback_days: i64,
    pub resend_days: i64,
    /// Deliver but record nothing.
    pub dry_run: bool,
    /// Summaries generated in parallel.
    pub summary_concurrency: usize,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            top_n: 3,
            lookback_days: 7,
            resend_days: 7,
            dry_run: false,
            summary_concurrency: 4,
        }
    }
}

/// Pick a subscriber's papers from the ranked batch, minus recent sends.
pub fn plan_for_subscriber(
    ranked: &[ScoredPaper],
    subscriber: &Subscriber,
    recently_sent: &HashSet<String>,
    top_n: usize,
    now: DateTime<Utc>,
) -> Vec<ScoredPaper> {
    let pool: Vec<ScoredPaper> = ranked
        .iter()
        .filter(|sp| !recently_sent.contains(&sp.paper.id))
        .cloned()
        .collect();
    let mut picks = select::personalized_top_n(&pool, &subscriber.preference, top_n);
    select::attach_reasons(&mut picks, now);
    picks
}

/// Summarize each paper once, keyed by id. Failures get the fallback text.
pub async fn summarize_all(
    summarizer: &dyn Summarizer,
    papers: &[PaperRecord],
    concurrency: usize,
) -> HashMap<String, String> {
    let results: Vec<(String, String)> = stream::iter(papers.iter().map(|paper| async move {
        let summary = match summarizer.summarize(paper).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(paper_id = %paper.id, error = %e, "Summary failed, using placeholder");
                SUMMARY_UNAVAILABLE.to_string()
            }
        };
        (paper.id.clone(), summary)
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    results.into_iter().collect()
}

/// Run the digest for every active subscriber.
pub async fn run(
    db: &Arc<dyn Database>,
    summarizer: &dyn Summarizer,
    sender: &dyn DigestSender,
    weights: &ScoreWeights,
    now: DateTime<Utc>,
    options: &DigestOptions,
) -> Result<DeliveryReport> {
    // Step 1: Load the batch
    let papers = db
        .get_recent_papers(days_before(now, options.lookback_days))
        .await?;
    info!(count = papers.len(), "Loaded papers for digest");

    // Step 2: Score once for everyone
    let ranked = select::score_papers(&papers, now, weights);
    let cache: Vec<(String, f64)> = ranked
        .iter()
        .map(|sp| (sp.paper.id.clone(), sp.score))
        .collect();
    db.cache_scores(&cache).await?;

    let subscribers = db.get_active_subscribers().await?;
    let mut report = DeliveryReport {
        total: subscribers.len(),
        ..DeliveryReport::default()
    };
    if subscribers.is_empty() {
        info!("No active subscribers, nothing to send");
        return Ok(report);
    }

    // Step 3: Select per subscriber
    let resend_since = days_before(now, options.resend_days);
    let mut plans: Vec<(&Subscriber, Vec<ScoredPaper>)> = Vec::new();
    for subscriber in &subscribers {
        let recently_sent = match db
            .get_recently_sent_paper_ids(subscriber.id, resend_since)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    subscriber = %subscriber.display_label(),
                    error = %e,
                    "Could not load sent history, skipping subscriber"
                );
                report.failed += 1;
                continue;
            }
        };
        let picks = plan_for_subscriber(&ranked, subscriber, &recently_sent, options.top_n, now);
        if picks.is_empty() {
            info!(
                subscriber = %subscriber.display_label(),
                "No eligible papers for subscriber, skipping"
            );
            report.skipped += 1;
            continue;
        }
        plans.push((subscriber, picks));
    }

    // Step 4: Summarize each selected paper once
    let mut seen = HashSet::new();
    let to_summarize: Vec<PaperRecord> = plans
        .iter()
        .flat_map(|(_, picks)| picks.iter())
        .filter(|sp| seen.insert(sp.paper.id.clone()))
        .map(|sp| sp.paper.clone())
        .collect();
    let summaries = summarize_all(summarizer, &to_summarize, options.summary_concurrency).await;
    info!(count = summaries.len(), "Summaries ready");

    // Step 5: Deliver
    for (subscriber, picks) in plans {
        let digest = Digest {
            entries: picks
                .into_iter()
                .map(|paper| DigestEntry {
                    summary: summaries
                        .get(&paper.paper.id)
                        .cloned()
                        .unwrap_or_else(|| SUMMARY_UNAVAILABLE.to_string()),
                    paper,
                })
                .collect(),
        };

        match sender.send(subscriber, &digest).await {
            Ok(()) => {
                report.sent += 1;
                if !options.dry_run {
                    if let Err(e) = db
                        .record_sent_papers(subscriber.id, &digest.paper_ids(), now)
                        .await
                    {
                        warn!(
                            subscriber = %subscriber.display_label(),
                            error = %e,
                            "Digest delivered but not recorded"
                        );
                    }
                }
            }
            Err(e) => {
                warn!(
                    subscriber = %subscriber.display_label(),
                    error = %e,
                    "Delivery failed, skipping subscriber"
                );
                report.failed += 1;
            }
        }
    }

    if !options.dry_run {
        db.set_run_state("last_digest_at", &now.to_rfc3339()).await?;
    }

    info!(
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        total = report.total,
        "Digest run complete"
    );
    Ok(report)
}
