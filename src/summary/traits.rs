// Summarizer trait — the swap-ready abstraction for paper summaries.
//
// The bundled implementation is extractive (see excerpt.rs). A hosted
// text-generation service can sit behind the same trait without touching the
// digest pipeline.

use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::PaperRecord;

/// Shown in place of a summary that failed to generate.
pub const SUMMARY_UNAVAILABLE: &str = "Summary temporarily unavailable";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize one paper as a few short bullet lines.
    async fn summarize(&self, paper: &PaperRecord) -> Result<String>;
}
