// Database trait — backend-agnostic async interface for all DB operations.
//
// Implementor: SqliteDatabase (wraps rusqlite behind a Mutex). Methods are
// async so the pipeline can hold an `Arc<dyn Database>` next to the other
// async collaborators and tests can swap the backend freely.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{PaperRecord, Subscriber, SubscriberPreference};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Run state ---

    /// Get a run state value by key (e.g., "last_digest_at").
    async fn get_run_state(&self, key: &str) -> Result<Option<String>>;

    /// Set a run state value (upsert).
    async fn set_run_state(&self, key: &str, value: &str) -> Result<()>;

    // --- Papers ---

    /// Insert or refresh papers from one source, stamped `fetched_at`.
    /// Returns rows written.
    async fn upsert_papers(
        &self,
        source: &str,
        papers: &[PaperRecord],
        fetched_at: DateTime<Utc>,
    ) -> Result<usize>;

    /// Papers fetched at or after `since`, one per id, in insertion order.
    async fn get_recent_papers(&self, since: DateTime<Utc>) -> Result<Vec<PaperRecord>>;

    /// Total number of stored papers.
    async fn paper_count(&self) -> Result<i64>;

    /// Overwrite the display score cache (keyed by paper id).
    async fn cache_scores(&self, scores: &[(String, f64)]) -> Result<()>;

    // --- Subscribers ---

    /// Add or reactivate a subscriber. Returns its id.
    async fn upsert_subscriber(
        &self,
        email: Option<&str>,
        telegram_chat_id: Option<&str>,
        preference: &SubscriberPreference,
    ) -> Result<i64>;

    /// Deactivate a subscriber. Returns false if nobody matched.
    async fn deactivate_subscriber(
        &self,
        email: Option<&str>,
        telegram_chat_id: Option<&str>,
    ) -> Result<bool>;

    /// All active subscribers, oldest first.
    async fn get_active_subscribers(&self) -> Result<Vec<Subscriber>>;

    /// Number of active subscribers.
    async fn active_subscriber_count(&self) -> Result<i64>;

    // --- Sent papers ---

    /// Paper ids delivered to a subscriber at or after `since`.
    async fn get_recently_sent_paper_ids(
        &self,
        subscriber_id: i64,
        since: DateTime<Utc>,
    ) -> Result<HashSet<String>>;

    /// Record a delivery made at `sent_at`.
    async fn record_sent_papers(
        &self,
        subscriber_id: i64,
        paper_ids: &[String],
        sent_at: DateTime<Utc>,
    ) -> Result<()>;
}
