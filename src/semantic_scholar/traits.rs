// Paper source trait — where a run's papers come from.
//
// The live implementation queries Semantic Scholar once per field. Tests and
// offline runs provide their own batches through the same interface.

use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::PaperRecord;

#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Short tag stored with every paper (the storage key is source + id).
    fn source_name(&self) -> &str;

    /// Papers published in the last `days`, at most `limit_per_field` per field,
    /// each tagged with its field and deduplicated by id.
    async fn fetch_recent(&self, days: i64, limit_per_field: u32) -> Result<Vec<PaperRecord>>;
}

/// A fixed batch, for offline runs and tests.
pub struct StaticSource {
    name: String,
    papers: Vec<PaperRecord>,
}

impl StaticSource {
    pub fn new(name: &str, papers: Vec<PaperRecord>) -> Self {
        Self {
            name: name.to_string(),
            papers,
        }
    }
}

#[async_trait]
impl PaperSource for StaticSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch_recent(&self, _days: i64, limit_per_field: u32) -> Result<Vec<PaperRecord>> {
        let limit = limit_per_field as usize;
        let mut per_field = std::collections::HashMap::new();
        Ok(self
            .papers
            .iter()
            .filter(|paper| {
                let taken = per_field.entry(paper.field).or_insert(0usize);
                *taken += 1;
                *taken <= limit
            })
            .cloned()
            .collect())
    }
}
