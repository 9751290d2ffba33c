// Fetch pipeline: pull recent papers from a source and persist them.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::db::Database;
use crate::semantic_scholar::traits::PaperSource;

/// Counts from one fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub fetched: usize,
    pub stored: usize,
}

/// Fetch papers published in the last `days` and upsert them.
pub async fn run(
    source: &dyn PaperSource,
    db: &Arc<dyn Database>,
    days: i64,
    limit_per_field: u32,
    now: DateTime<Utc>,
) -> Result<FetchSummary> {
    let papers = source.fetch_recent(days, limit_per_field).await?;
    info!(
        source = source.source_name(),
        count = papers.len(),
        "Papers fetched"
    );

    let stored = db
        .upsert_papers(source.source_name(), &papers, now)
        .await?;
    db.set_run_state("last_fetch_at", &now.to_rfc3339()).await?;

    Ok(FetchSummary {
        fetched: papers.len(),
        stored,
    })
}
