// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::models::{Field, PaperRecord, Subscriber, SubscriberPreference};

// --- Run state ---

/// Get a run state value by key (e.g., "last_fetch_at").
pub fn get_run_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM run_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a run state value (upsert).
pub fn set_run_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO run_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

/// Timestamp in SQLite's `datetime()` text form, so stamps written here
/// compare correctly against column defaults.
fn sql_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

// --- Papers ---

fn count_to_sql(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Insert or refresh papers from one source. Returns the number of rows written.
///
/// A re-fetched paper keeps its row but gets fresh counts and a new
/// `fetched_at`, so it rejoins the current batch.
pub fn upsert_papers(
    conn: &Connection,
    source: &str,
    papers: &[PaperRecord],
    fetched_at: DateTime<Utc>,
) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO papers (source, external_id, title, abstract, authors, citation_count,
                             influential_citation_count, published_at, field, url, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(source, external_id) DO UPDATE SET
            title = ?3,
            abstract = ?4,
            authors = ?5,
            citation_count = ?6,
            influential_citation_count = ?7,
            published_at = ?8,
            field = ?9,
            url = ?10,
            fetched_at = ?11",
    )?;

    let fetched_at = sql_timestamp(fetched_at);
    let mut written = 0;
    for paper in papers {
        let authors_json = serde_json::to_string(&paper.authors)?;
        written += stmt.execute(params![
            source,
            paper.id,
            paper.title,
            paper.abstract_text,
            authors_json,
            count_to_sql(paper.citation_count),
            count_to_sql(paper.influential_citation_count),
            paper.publication_date,
            paper.field.tag(),
            paper.url,
            fetched_at,
        ])?;
    }
    Ok(written)
}

/// Papers fetched at or after `since`, in insertion order.
///
/// An id stored under more than one source appears once (first row wins).
/// Rows with a field tag this build doesn't know are skipped with a warning.
pub fn get_recent_papers(conn: &Connection, since: DateTime<Utc>) -> Result<Vec<PaperRecord>> {
    let mut stmt = conn.prepare(
        "SELECT external_id, title, abstract, authors, citation_count,
                influential_citation_count, published_at, field, url
         FROM papers
         WHERE fetched_at >= ?1
         ORDER BY id",
    )?;

    let rows = stmt.query_map(params![sql_timestamp(since)], |row| {
        let id: String = row.get(0)?;
        let tag: String = row.get(7)?;
        let field = match tag.parse::<Field>() {
            Ok(field) => field,
            Err(e) => return Ok(Err((id, e))),
        };
        let authors_json: String = row.get(3)?;
        let citations: i64 = row.get(4)?;
        let influential: i64 = row.get(5)?;
        Ok(Ok(PaperRecord {
            id,
            title: row.get(1)?,
            abstract_text: row.get(2)?,
            authors: serde_json::from_str(&authors_json).unwrap_or_default(),
            citation_count: citations.max(0) as u64,
            influential_citation_count: influential.max(0) as u64,
            publication_date: row.get(6)?,
            field,
            url: row.get(8)?,
        }))
    })?;

    let mut seen = HashSet::new();
    let mut papers = Vec::new();
    for row in rows {
        match row? {
            Ok(paper) => {
                if seen.insert(paper.id.clone()) {
                    papers.push(paper);
                } else {
                    warn!(paper_id = %paper.id, "Skipping duplicate paper from another source");
                }
            }
            Err((paper_id, e)) => {
                warn!(paper_id = %paper_id, error = %e, "Skipping paper with unknown field")
            }
        }
    }
    Ok(papers)
}

/// Total number of stored papers.
pub fn paper_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
    Ok(count)
}

/// Overwrite the display score cache for the given papers.
pub fn cache_scores(conn: &Connection, scores: &[(String, f64)]) -> Result<()> {
    let mut stmt = conn.prepare("UPDATE papers SET score = ?2 WHERE external_id = ?1")?;
    for (paper_id, score) in scores {
        stmt.execute(params![paper_id, score])?;
    }
    Ok(())
}

/// Read a cached display score (None if never scored).
pub fn get_cached_score(conn: &Connection, paper_id: &str) -> Result<Option<f64>> {
    let result: Option<Option<f64>> = conn
        .query_row(
            "SELECT score FROM papers WHERE external_id = ?1",
            params![paper_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(result.flatten())
}

// --- Subscribers ---

/// Add a subscriber, or reactivate and update an existing one. Returns its id.
pub fn upsert_subscriber(
    conn: &Connection,
    email: Option<&str>,
    telegram_chat_id: Option<&str>,
    preference: &SubscriberPreference,
) -> Result<i64> {
    if email.is_none() && telegram_chat_id.is_none() {
        anyhow::bail!("A subscriber needs an email address or a Telegram chat id");
    }

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM subscribers WHERE email = ?1 OR telegram_chat_id = ?2",
            params![email, telegram_chat_id],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE subscribers SET
                    email = COALESCE(?2, email),
                    telegram_chat_id = COALESCE(?3, telegram_chat_id),
                    preferred_fields = ?4,
                    is_active = 1
                 WHERE id = ?1",
                params![id, email, telegram_chat_id, preference.to_list()],
            )?;
            Ok(id)
        }
        None => {
            conn.execute(
                "INSERT INTO subscribers (email, telegram_chat_id, preferred_fields)
                 VALUES (?1, ?2, ?3)",
                params![email, telegram_chat_id, preference.to_list()],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}

/// Mark a subscriber inactive. Returns false if no active subscriber matched.
pub fn deactivate_subscriber(
    conn: &Connection,
    email: Option<&str>,
    telegram_chat_id: Option<&str>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE subscribers SET is_active = 0
         WHERE is_active = 1 AND (email = ?1 OR telegram_chat_id = ?2)",
        params![email, telegram_chat_id],
    )?;
    Ok(changed > 0)
}

/// All active subscribers, oldest first.
pub fn get_active_subscribers(conn: &Connection) -> Result<Vec<Subscriber>> {
    let mut stmt = conn.prepare(
        "SELECT id, email, telegram_chat_id, preferred_fields
         FROM subscribers
         WHERE is_active = 1
         ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut subscribers = Vec::new();
    for row in rows {
        let (id, email, telegram_chat_id, fields) = row?;
        // Unknown tags shouldn't make a subscriber fall back to "everything",
        // so keep only the ones that parse.
        let preference = SubscriberPreference::new(fields.split(',').filter_map(|tag| {
            let tag = tag.trim();
            if tag.is_empty() {
                return None;
            }
            match tag.parse() {
                Ok(field) => Some(field),
                Err(e) => {
                    warn!(subscriber_id = id, error = %e, "Ignoring unknown preferred field");
                    None
                }
            }
        }));
        subscribers.push(Subscriber {
            id,
            email,
            telegram_chat_id,
            preference,
        });
    }
    Ok(subscribers)
}

/// Number of active subscribers.
pub fn active_subscriber_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM subscribers WHERE is_active = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

// --- Sent papers ---

/// Paper ids sent to a subscriber at or after `since`.
pub fn get_recently_sent_paper_ids(
    conn: &Connection,
    subscriber_id: i64,
    since: DateTime<Utc>,
) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT paper_id FROM sent_papers
         WHERE subscriber_id = ?1 AND sent_at >= ?2",
    )?;
    let rows = stmt.query_map(params![subscriber_id, sql_timestamp(since)], |row| {
        row.get::<_, String>(0)
    })?;

    let mut ids = HashSet::new();
    for row in rows {
        ids.insert(row?);
    }
    Ok(ids)
}

/// Record that these papers were delivered to a subscriber.
pub fn record_sent_papers(
    conn: &Connection,
    subscriber_id: i64,
    paper_ids: &[String],
    sent_at: DateTime<Utc>,
) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO sent_papers (paper_id, subscriber_id, sent_at) VALUES (?1, ?2, ?3)",
    )?;
    let sent_at = sql_timestamp(sent_at);
    for paper_id in paper_ids {
        stmt.execute(params![paper_id, subscriber_id, sent_at])?;
    }
    Ok(())
}
