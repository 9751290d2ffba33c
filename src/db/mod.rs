// Database layer — SQLite storage for papers, subscribers and the sent ledger.
//
// We use rusqlite with the "bundled" feature so there's no system SQLite
// dependency. The database file lives wherever EVERYMORNING_DB_PATH points
// (defaults to ./everymorning.db).

pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use traits::Database;

/// Source tag for papers from the Semantic Scholar Graph API.
pub const SEMANTIC_SCHOLAR_SOURCE: &str = "semantic_scholar";

/// Source tag for papers loaded with `everymorning import`.
pub const IMPORT_SOURCE: &str = "import";

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Open (or create) a SQLite database, run migrations, and wrap it.
///
/// Called by `everymorning init` and by any command that writes papers.
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    // Create parent directories if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = rusqlite::Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Open an existing SQLite database (fails if it doesn't exist yet).
///
/// Migrations still run so an older file picks up new tables.
pub fn open_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `everymorning init` first.",
            db_path
        );
    }

    let conn = rusqlite::Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    schema::create_tables(&conn)?;

    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// A fresh in-memory database, for dry runs and tests.
pub fn in_memory_sqlite() -> Result<Arc<dyn Database>> {
    let conn = rusqlite::Connection::open_in_memory()
        .context("Failed to open in-memory database")?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}
