// Paper fetching — one search per field, tagged and deduplicated.
//
// Each field's display name is the search query. A field whose request fails
// is logged and skipped so one bad response doesn't empty the whole digest.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::client::{ApiPaper, SemanticScholarClient};
use super::traits::PaperSource;
use crate::db::models::{Field, PaperRecord};
use crate::db::SEMANTIC_SCHOLAR_SOURCE;
use crate::scoring::clock::Clock;

/// Convert an API paper into a record. Papers without an id are dropped.
pub fn to_record(api: ApiPaper, field: Field) -> Option<PaperRecord> {
    let id = api.paper_id.filter(|id| !id.trim().is_empty())?;
    Some(PaperRecord {
        id,
        title: api.title.unwrap_or_else(|| "Untitled".to_string()),
        abstract_text: api.abstract_text.filter(|a| !a.trim().is_empty()),
        authors: api.authors.into_iter().filter_map(|a| a.name).collect(),
        // Negative counts would be a source bug; treat them like missing
        citation_count: api.citation_count.unwrap_or(0).max(0) as u64,
        influential_citation_count: api.influential_citation_count.unwrap_or(0).max(0) as u64,
        publication_date: api.publication_date,
        field,
        url: api.url,
    })
}

/// Fetch recent papers for one field.
pub async fn fetch_papers_by_field(
    client: &SemanticScholarClient,
    field: Field,
    published_since: &str,
    limit: u32,
) -> Result<Vec<PaperRecord>> {
    let api_papers = client
        .search_papers(field.display_name(), limit, published_since)
        .await
        .with_context(|| format!("Failed to fetch {} papers", field.tag()))?;

    Ok(api_papers
        .into_iter()
        .filter_map(|api| to_record(api, field))
        .collect())
}

/// Keep the first occurrence of every paper id, preserving order.
pub fn dedupe_by_id(papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen = HashSet::new();
    papers
        .into_iter()
        .filter(|paper| seen.insert(paper.id.clone()))
        .collect()
}

/// Fetch every field in table order, then dedupe across fields.
pub async fn fetch_all_fields(
    client: &SemanticScholarClient,
    published_since: &str,
    limit_per_field: u32,
) -> Result<Vec<PaperRecord>> {
    let fields: Vec<Field> = Field::all().collect();
    let pb = ProgressBar::new(fields.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Fields [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut all = Vec::new();
    for field in fields {
        pb.set_message(field.display_name());
        match fetch_papers_by_field(client, field, published_since, limit_per_field).await {
            Ok(papers) => {
                info!(field = field.tag(), count = papers.len(), "Fetched papers");
                all.extend(papers);
            }
            Err(e) => {
                warn!(field = field.tag(), error = %e, "Field fetch failed, skipping");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(dedupe_by_id(all))
}

/// `PaperSource` backed by the live Graph API.
pub struct SemanticScholarSource {
    client: SemanticScholarClient,
    clock: Box<dyn Clock>,
}

impl SemanticScholarSource {
    pub fn new(client: SemanticScholarClient, clock: Box<dyn Clock>) -> Self {
        Self { client, clock }
    }
}

#[async_trait]
impl PaperSource for SemanticScholarSource {
    fn source_name(&self) -> &str {
        SEMANTIC_SCHOLAR_SOURCE
    }

    async fn fetch_recent(&self, days: i64, limit_per_field: u32) -> Result<Vec<PaperRecord>> {
        let since = (self.clock.now() - Duration::days(days))
            .format("%Y-%m-%d")
            .to_string();
        fetch_all_fields(&self.client, &since, limit_per_field).await
    }
}
