// System status display — shows DB stats, stored papers, subscribers, last runs.

use anyhow::Result;
use std::sync::Arc;

use crate::db::Database;

/// Display system status to the terminal.
///
/// Expects an opened database; `main` handles the uninitialized case.
pub async fn show(db: &Arc<dyn Database>, db_path: &str) -> Result<()> {
    // Database file size
    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    let papers = db.paper_count().await?;
    println!("Papers stored: {papers}");
    if papers == 0 {
        println!("  Run `everymorning fetch` to pull recent papers");
    }

    let subscribers = db.active_subscriber_count().await?;
    println!("Active subscribers: {subscribers}");
    if subscribers == 0 {
        println!("  Run `everymorning subscribe --email you@example.com` to add one");
    }

    match db.get_run_state("last_fetch_at").await? {
        Some(at) => println!("Last fetch: {at}"),
        None => println!("Last fetch: never"),
    }
    match db.get_run_state("last_digest_at").await? {
        Some(at) => println!("Last digest: {at}"),
        None => println!("Last digest: never"),
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
