// Composition tests — the fetch and digest pipelines end to end.
//
// These tests run the real pipelines against an in-memory SQLite database
// with a static paper source and fake summarizer/sender collaborators:
//   StaticSource -> fetch -> SQLite -> score -> select -> reason
//     -> summarize -> deliver -> sent ledger
// No network access; the markdown sender test writes under the temp dir.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use everymorning::db::models::{Field, PaperRecord, Subscriber, SubscriberPreference};
use everymorning::db::{in_memory_sqlite, Database};
use everymorning::delivery::file::MarkdownFileSender;
use everymorning::delivery::traits::{Digest, DigestSender};
use everymorning::pipeline::digest::{self, DigestOptions};
use everymorning::pipeline::fetch;
use everymorning::scoring::clock::{days_before, Clock, FixedClock};
use everymorning::scoring::paper::ScoreWeights;
use everymorning::semantic_scholar::traits::StaticSource;
use everymorning::summary::excerpt::ExcerptSummarizer;
use everymorning::summary::traits::{Summarizer, SUMMARY_UNAVAILABLE};

// ============================================================
// Fakes
// ============================================================

/// Summarizes every paper except "b1", and counts calls.
#[derive(Default)]
struct FakeSummarizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, paper: &PaperRecord) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if paper.id == "b1" {
            anyhow::bail!("summary service overloaded");
        }
        Ok(format!("• about {}", paper.id))
    }
}

/// What one delivery carried.
#[derive(Debug, Clone)]
struct Delivered {
    subscriber_id: i64,
    paper_ids: Vec<String>,
    summaries: Vec<String>,
    reasons: Vec<Option<String>>,
}

/// Records deliveries; optionally fails for one subscriber.
#[derive(Default)]
struct RecordingSender {
    delivered: Mutex<Vec<Delivered>>,
    fail_for: Option<i64>,
}

impl RecordingSender {
    fn failing_for(subscriber_id: i64) -> Self {
        Self {
            fail_for: Some(subscriber_id),
            ..Self::default()
        }
    }

    fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }

    fn papers_for(&self, subscriber_id: i64) -> Option<Vec<String>> {
        self.delivered()
            .into_iter()
            .find(|d| d.subscriber_id == subscriber_id)
            .map(|d| d.paper_ids)
    }
}

#[async_trait]
impl DigestSender for RecordingSender {
    async fn send(&self, subscriber: &Subscriber, digest: &Digest) -> Result<()> {
        if self.fail_for == Some(subscriber.id) {
            anyhow::bail!("mailbox full");
        }
        self.delivered.lock().unwrap().push(Delivered {
            subscriber_id: subscriber.id,
            paper_ids: digest.paper_ids(),
            summaries: digest.entries.iter().map(|e| e.summary.clone()).collect(),
            reasons: digest
                .entries
                .iter()
                .map(|e| e.paper.selection_reason.clone())
                .collect(),
        });
        Ok(())
    }
}

/// Delegates to a real database, with switchable storage failures.
struct FlakyDatabase {
    inner: Arc<dyn Database>,
    history_broken_for: Option<i64>,
    ledger_broken: bool,
}

#[async_trait]
impl Database for FlakyDatabase {
    async fn table_count(&self) -> Result<i64> {
        self.inner.table_count().await
    }

    async fn get_run_state(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_run_state(key).await
    }

    async fn set_run_state(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set_run_state(key, value).await
    }

    async fn upsert_papers(
        &self,
        source: &str,
        papers: &[PaperRecord],
        fetched_at: DateTime<Utc>,
    ) -> Result<usize> {
        self.inner.upsert_papers(source, papers, fetched_at).await
    }

    async fn get_recent_papers(&self, since: DateTime<Utc>) -> Result<Vec<PaperRecord>> {
        self.inner.get_recent_papers(since).await
    }

    async fn paper_count(&self) -> Result<i64> {
        self.inner.paper_count().await
    }

    async fn cache_scores(&self, scores: &[(String, f64)]) -> Result<()> {
        self.inner.cache_scores(scores).await
    }

    async fn upsert_subscriber(
        &self,
        email: Option<&str>,
        telegram_chat_id: Option<&str>,
        preference: &SubscriberPreference,
    ) -> Result<i64> {
        self.inner
            .upsert_subscriber(email, telegram_chat_id, preference)
            .await
    }

    async fn deactivate_subscriber(
        &self,
        email: Option<&str>,
        telegram_chat_id: Option<&str>,
    ) -> Result<bool> {
        self.inner.deactivate_subscriber(email, telegram_chat_id).await
    }

    async fn get_active_subscribers(&self) -> Result<Vec<Subscriber>> {
        self.inner.get_active_subscribers().await
    }

    async fn active_subscriber_count(&self) -> Result<i64> {
        self.inner.active_subscriber_count().await
    }

    async fn get_recently_sent_paper_ids(
        &self,
        subscriber_id: i64,
        since: DateTime<Utc>,
    ) -> Result<HashSet<String>> {
        if self.history_broken_for == Some(subscriber_id) {
            anyhow::bail!("disk I/O error");
        }
        self.inner
            .get_recently_sent_paper_ids(subscriber_id, since)
            .await
    }

    async fn record_sent_papers(
        &self,
        subscriber_id: i64,
        paper_ids: &[String],
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.ledger_broken {
            anyhow::bail!("database is locked");
        }
        self.inner
            .record_sent_papers(subscriber_id, paper_ids, sent_at)
            .await
    }
}

// ============================================================
// Fixtures
// ============================================================

fn now() -> DateTime<Utc> {
    FixedClock::at_date(2026, 6, 15).unwrap().now()
}

fn week_ago() -> DateTime<Utc> {
    days_before(now(), 7)
}

fn paper(id: &str, field: Field, citations: u64) -> PaperRecord {
    PaperRecord {
        id: id.to_string(),
        title: format!("Paper {id}"),
        abstract_text: Some(format!("We present {id}. It is new. It is tested.")),
        authors: vec!["Lise Meitner".to_string()],
        citation_count: citations,
        influential_citation_count: citations / 5,
        publication_date: Some((now() - Duration::days(4)).format("%Y-%m-%d").to_string()),
        field,
        url: Some(format!("https://papers.example.org/{id}")),
    }
}

/// Ranked c1 > b1 > c2 > p1. No math papers.
fn batch() -> Vec<PaperRecord> {
    vec![
        paper("c2", Field::Cs, 10),
        paper("b1", Field::Bio, 30),
        paper("p1", Field::Physics, 5),
        paper("c1", Field::Cs, 40),
    ]
}

struct World {
    db: Arc<dyn Database>,
    alice: i64,
    bob: i64,
    carol: i64,
}

/// Stored batch plus three subscribers:
/// alice wants cs, bob has no preference, carol wants math only.
async fn world() -> World {
    let db = in_memory_sqlite().unwrap();
    let source = StaticSource::new("fixture", batch());
    fetch::run(&source, &db, 7, 50, now()).await.unwrap();

    let alice = db
        .upsert_subscriber(
            Some("alice@example.org"),
            None,
            &SubscriberPreference::new([Field::Cs]),
        )
        .await
        .unwrap();
    let bob = db
        .upsert_subscriber(None, Some("1001"), &SubscriberPreference::default())
        .await
        .unwrap();
    let carol = db
        .upsert_subscriber(
            Some("carol@example.org"),
            None,
            &SubscriberPreference::new([Field::Math]),
        )
        .await
        .unwrap();

    World {
        db,
        alice,
        bob,
        carol,
    }
}

fn options(top_n: usize) -> DigestOptions {
    DigestOptions {
        top_n,
        ..DigestOptions::default()
    }
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ============================================================
// Fetch
// ============================================================

#[tokio::test]
async fn fetch_stores_batch_and_stamps_run() {
    let db = in_memory_sqlite().unwrap();
    let source = StaticSource::new("fixture", batch());

    let summary = fetch::run(&source, &db, 7, 1, now()).await.unwrap();
    // One per field: c2 (first cs), b1, p1
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.stored, 3);
    assert_eq!(db.paper_count().await.unwrap(), 3);
    assert_eq!(
        db.get_run_state("last_fetch_at").await.unwrap(),
        Some(now().to_rfc3339())
    );
}

// ============================================================
// Digest
// ============================================================

#[tokio::test]
async fn digest_personalizes_and_skips_unmatched() {
    let w = world().await;
    let summarizer = FakeSummarizer::default();
    let sender = RecordingSender::default();

    let report = digest::run(
        &w.db,
        &summarizer,
        &sender,
        &ScoreWeights::default(),
        now(),
        &options(2),
    )
    .await
    .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.sent, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    assert_eq!(sender.papers_for(w.alice), Some(ids(&["c1", "c2"])));
    assert_eq!(sender.papers_for(w.bob), Some(ids(&["c1", "b1"])));
    assert_eq!(sender.papers_for(w.carol), None);
}

#[tokio::test]
async fn digest_summarizes_each_paper_once() {
    let w = world().await;
    let summarizer = FakeSummarizer::default();
    let sender = RecordingSender::default();

    digest::run(
        &w.db,
        &summarizer,
        &sender,
        &ScoreWeights::default(),
        now(),
        &options(2),
    )
    .await
    .unwrap();

    // c1 goes to both alice and bob but is summarized once: c1, c2, b1
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 3);

    let bob = sender
        .delivered()
        .into_iter()
        .find(|d| d.subscriber_id == w.bob)
        .unwrap();
    assert_eq!(bob.summaries, vec!["• about c1".to_string(), SUMMARY_UNAVAILABLE.to_string()]);
    assert!(bob
        .reasons
        .iter()
        .all(|r| r.as_deref().is_some_and(|r| r.starts_with("Selected for: "))));
}

#[tokio::test]
async fn second_run_skips_recently_sent() {
    let w = world().await;
    let summarizer = FakeSummarizer::default();
    let weights = ScoreWeights::default();

    let first = RecordingSender::default();
    digest::run(&w.db, &summarizer, &first, &weights, now(), &options(2))
        .await
        .unwrap();

    let second = RecordingSender::default();
    let report = digest::run(&w.db, &summarizer, &second, &weights, now(), &options(2))
        .await
        .unwrap();

    // alice already has both cs papers; bob gets the next two
    assert_eq!(second.papers_for(w.alice), None);
    assert_eq!(second.papers_for(w.bob), Some(ids(&["c2", "p1"])));
    assert_eq!(report.sent, 1);
    assert_eq!(report.skipped, 2);
}

#[tokio::test]
async fn dry_run_records_nothing() {
    let w = world().await;
    let summarizer = FakeSummarizer::default();
    let sender = RecordingSender::default();
    let dry = DigestOptions {
        dry_run: true,
        ..options(2)
    };

    let report = digest::run(
        &w.db,
        &summarizer,
        &sender,
        &ScoreWeights::default(),
        now(),
        &dry,
    )
    .await
    .unwrap();

    assert_eq!(report.sent, 2);
    assert!(w
        .db
        .get_recently_sent_paper_ids(w.alice, week_ago())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(w.db.get_run_state("last_digest_at").await.unwrap(), None);
}

#[tokio::test]
async fn failed_delivery_only_affects_that_subscriber() {
    let w = world().await;
    let summarizer = FakeSummarizer::default();
    let sender = RecordingSender::failing_for(w.alice);

    let report = digest::run(
        &w.db,
        &summarizer,
        &sender,
        &ScoreWeights::default(),
        now(),
        &options(2),
    )
    .await
    .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.sent, 1);
    assert!(w
        .db
        .get_recently_sent_paper_ids(w.alice, week_ago())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        w.db.get_recently_sent_paper_ids(w.bob, week_ago()).await.unwrap().len(),
        2
    );
    assert_eq!(
        w.db.get_run_state("last_digest_at").await.unwrap(),
        Some(now().to_rfc3339())
    );
}

#[tokio::test]
async fn storage_failure_only_affects_that_subscriber() {
    let w = world().await;
    let db: Arc<dyn Database> = Arc::new(FlakyDatabase {
        inner: w.db.clone(),
        history_broken_for: Some(w.alice),
        ledger_broken: false,
    });
    let sender = RecordingSender::default();

    let report = digest::run(
        &db,
        &FakeSummarizer::default(),
        &sender,
        &ScoreWeights::default(),
        now(),
        &options(2),
    )
    .await
    .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.sent, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(sender.papers_for(w.alice), None);
    assert_eq!(sender.papers_for(w.bob), Some(ids(&["c1", "b1"])));
    assert_eq!(
        w.db.get_run_state("last_digest_at").await.unwrap(),
        Some(now().to_rfc3339())
    );
}

#[tokio::test]
async fn unrecorded_delivery_still_counts_as_sent() {
    let w = world().await;
    let db: Arc<dyn Database> = Arc::new(FlakyDatabase {
        inner: w.db.clone(),
        history_broken_for: None,
        ledger_broken: true,
    });
    let sender = RecordingSender::default();

    let report = digest::run(
        &db,
        &FakeSummarizer::default(),
        &sender,
        &ScoreWeights::default(),
        now(),
        &options(2),
    )
    .await
    .unwrap();

    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 0);
    assert!(w
        .db
        .get_recently_sent_paper_ids(w.bob, week_ago())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        w.db.get_run_state("last_digest_at").await.unwrap(),
        Some(now().to_rfc3339())
    );
}

#[tokio::test]
async fn windows_are_measured_from_the_run_clock() {
    let w = world().await;
    let summarizer = FakeSummarizer::default();
    let weights = ScoreWeights::default();

    // Ten days after the fetch, a 7-day batch window is empty
    let late = RecordingSender::default();
    let report = digest::run(
        &w.db,
        &summarizer,
        &late,
        &weights,
        now() + Duration::days(10),
        &options(2),
    )
    .await
    .unwrap();
    assert_eq!(report.sent, 0);
    assert_eq!(report.skipped, 3);

    let first = RecordingSender::default();
    digest::run(&w.db, &summarizer, &first, &weights, now(), &options(2))
        .await
        .unwrap();

    // Eight days on, with a wider batch window, the 7-day resend window
    // has lapsed and alice gets the same cs papers again
    let again = RecordingSender::default();
    let wide = DigestOptions {
        lookback_days: 14,
        ..options(2)
    };
    digest::run(
        &w.db,
        &summarizer,
        &again,
        &weights,
        now() + Duration::days(8),
        &wide,
    )
    .await
    .unwrap();
    assert_eq!(again.papers_for(w.alice), Some(ids(&["c1", "c2"])));
}

#[tokio::test]
async fn no_subscribers_is_an_empty_report() {
    let db = in_memory_sqlite().unwrap();
    let source = StaticSource::new("fixture", batch());
    fetch::run(&source, &db, 7, 50, now()).await.unwrap();

    let report = digest::run(
        &db,
        &FakeSummarizer::default(),
        &RecordingSender::default(),
        &ScoreWeights::default(),
        now(),
        &options(3),
    )
    .await
    .unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.sent, 0);
}

#[tokio::test]
async fn markdown_sender_writes_one_file_per_subscriber() {
    let w = world().await;
    let dir = std::env::temp_dir().join(format!("everymorning-digest-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let sender = MarkdownFileSender::new(&dir, "2026-06-15");

    let report = digest::run(
        &w.db,
        &ExcerptSummarizer::default(),
        &sender,
        &ScoreWeights::default(),
        now(),
        &DigestOptions {
            dry_run: true,
            ..options(1)
        },
    )
    .await
    .unwrap();
    assert_eq!(report.sent, 2);

    let alice = std::fs::read_to_string(dir.join(format!(
        "digest-2026-06-15-subscriber-{}.md",
        w.alice
    )))
    .unwrap();
    assert!(alice.starts_with("# everymorning - Daily STEM Paper Digest"));
    assert!(alice.contains("[Paper c1](https://papers.example.org/c1)"));
    assert!(alice.contains("• We present c1."));
    assert!(!alice.contains("alice@example.org"));

    let _ = std::fs::remove_dir_all(&dir);
}
