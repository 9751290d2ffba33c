// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{PaperRecord, Subscriber, SubscriberPreference};
use super::queries;
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_run_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        queries::get_run_state(&conn, key)
    }

    async fn set_run_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::set_run_state(&conn, key, value)
    }

    async fn upsert_papers(
        &self,
        source: &str,
        papers: &[PaperRecord],
        fetched_at: DateTime<Utc>,
    ) -> Result<usize> {
        let conn = self.conn.lock().await;
        queries::upsert_papers(&conn, source, papers, fetched_at)
    }

    async fn get_recent_papers(&self, since: DateTime<Utc>) -> Result<Vec<PaperRecord>> {
        let conn = self.conn.lock().await;
        queries::get_recent_papers(&conn, since)
    }

    async fn paper_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::paper_count(&conn)
    }

    async fn cache_scores(&self, scores: &[(String, f64)]) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::cache_scores(&conn, scores)
    }

    async fn upsert_subscriber(
        &self,
        email: Option<&str>,
        telegram_chat_id: Option<&str>,
        preference: &SubscriberPreference,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::upsert_subscriber(&conn, email, telegram_chat_id, preference)
    }

    async fn deactivate_subscriber(
        &self,
        email: Option<&str>,
        telegram_chat_id: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::deactivate_subscriber(&conn, email, telegram_chat_id)
    }

    async fn get_active_subscribers(&self) -> Result<Vec<Subscriber>> {
        let conn = self.conn.lock().await;
        queries::get_active_subscribers(&conn)
    }

    async fn active_subscriber_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::active_subscriber_count(&conn)
    }

    async fn get_recently_sent_paper_ids(
        &self,
        subscriber_id: i64,
        since: DateTime<Utc>,
    ) -> Result<HashSet<String>> {
        let conn = self.conn.lock().await;
        queries::get_recently_sent_paper_ids(&conn, subscriber_id, since)
    }

    async fn record_sent_papers(
        &self,
        subscriber_id: i64,
        paper_ids: &[String],
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::record_sent_papers(&conn, subscriber_id, paper_ids, sent_at)
    }
}
