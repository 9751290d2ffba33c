// Database schema — versioned migrations.
//
// Each entry in `MIGRATIONS` is applied once, in order, inside its own
// transaction, and recorded in `schema_version`. New schema changes are
// appended as a new version; shipped entries are never edited.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// (version, SQL) pairs, oldest first.
const MIGRATIONS: &[(i64, &str)] = &[
    (
        1,
        "
        -- Papers as fetched from the literature API, one row per source paper
        CREATE TABLE papers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,                  -- e.g. 'semantic_scholar'
            external_id TEXT NOT NULL,             -- the source's paper id
            title TEXT NOT NULL,
            abstract TEXT,
            authors TEXT NOT NULL DEFAULT '[]',    -- JSON array of names
            citation_count INTEGER NOT NULL DEFAULT 0,
            influential_citation_count INTEGER NOT NULL DEFAULT 0,
            published_at TEXT,                     -- raw date string from the source
            field TEXT NOT NULL,                   -- cs / physics / bio / math
            url TEXT,
            score REAL,                            -- display cache, rewritten every rescore
            fetched_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (source, external_id)
        );
        CREATE INDEX idx_papers_fetched ON papers(fetched_at);

        -- Digest recipients
        CREATE TABLE subscribers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT UNIQUE,
            telegram_chat_id TEXT UNIQUE,
            preferred_fields TEXT NOT NULL DEFAULT '',  -- comma-separated field tags
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Which papers went to which subscriber, for the resend window
        CREATE TABLE sent_papers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            paper_id TEXT NOT NULL,                -- papers.external_id
            subscriber_id INTEGER NOT NULL,
            sent_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX idx_sent_subscriber ON sent_papers(subscriber_id, sent_at);

        -- Key/value run bookkeeping (last_fetch_at, last_digest_at)
        CREATE TABLE run_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    ),
    (2, "CREATE INDEX idx_papers_field ON papers(field);"),
];

/// Bring the schema up to the latest version. Safe to call on every open.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("Failed to create schema_version table")?;

    let current = current_version(conn)?;
    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        apply(conn, *version, sql)?;
    }
    Ok(())
}

/// Highest applied migration, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn apply(conn: &Connection, version: i64, sql: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)
        .with_context(|| format!("Migration v{version} failed"))?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    tx.commit()?;
    Ok(())
}

/// Number of user tables, shown by `everymorning init`.
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
