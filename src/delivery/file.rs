// Markdown file sender — one file per subscriber per day.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::traits::{Digest, DigestSender};
use crate::db::models::Subscriber;
use crate::output::digest::format_digest_markdown;

pub struct MarkdownFileSender {
    dir: PathBuf,
    /// Date stamp used in file names and headers (YYYY-MM-DD)
    date: String,
}

impl MarkdownFileSender {
    pub fn new(dir: &Path, date: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            date: date.to_string(),
        }
    }

    /// Where a subscriber's digest lands. Subscriber ids keep names unique
    /// without putting addresses on disk.
    pub fn path_for(&self, subscriber: &Subscriber) -> PathBuf {
        self.dir
            .join(format!("digest-{}-subscriber-{}.md", self.date, subscriber.id))
    }
}

#[async_trait]
impl DigestSender for MarkdownFileSender {
    async fn send(&self, subscriber: &Subscriber, digest: &Digest) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))?;

        let path = self.path_for(subscriber);
        let body = format_digest_markdown(digest, &self.date);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write digest to {}", path.display()))?;

        info!(path = %path.display(), papers = digest.entries.len(), "Digest written");
        Ok(())
    }
}
