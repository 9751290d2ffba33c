// Terminal sender — prints each digest, for dry runs and local use.

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;

use super::traits::{Digest, DigestSender};
use crate::db::models::Subscriber;
use crate::output::digest::format_digest_text;

pub struct TerminalSender;

#[async_trait]
impl DigestSender for TerminalSender {
    async fn send(&self, subscriber: &Subscriber, digest: &Digest) -> Result<()> {
        println!(
            "\n{}",
            format!("--- Digest for {} ---", subscriber.display_label()).bold()
        );
        println!("{}", format_digest_text(digest));
        Ok(())
    }
}
