// Digest sender trait — how a finished digest reaches a subscriber.
//
// Email and chat transports are out of this crate; the bundled senders print
// to the terminal or write markdown files. All of them receive the same
// `Digest`, already ranked, explained and summarized.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::models::{ScoredPaper, Subscriber};

/// One paper in a digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEntry {
    pub paper: ScoredPaper,
    pub summary: String,
}

/// An ordered, ready-to-render digest for one subscriber.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub entries: Vec<DigestEntry>,
}

impl Digest {
    pub fn paper_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.paper.paper.id.clone())
            .collect()
    }
}

/// Outcome of delivering to every subscriber in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    /// Subscribers skipped because nothing matched their preferences
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

#[async_trait]
pub trait DigestSender: Send + Sync {
    /// Deliver one digest. An error counts as a failed delivery for that
    /// subscriber only.
    async fn send(&self, subscriber: &Subscriber, digest: &Digest) -> Result<()>;
}
