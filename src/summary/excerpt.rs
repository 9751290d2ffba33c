// Extractive summarizer — the first sentences of the abstract as bullets.
//
// Needs no network access, so dry runs and tests always produce a summary.

use anyhow::Result;
use async_trait::async_trait;

use super::traits::Summarizer;
use super::{sanitize_input, MAX_ABSTRACT_LENGTH};
use crate::db::models::PaperRecord;
use crate::output::truncate_chars;

pub const NO_ABSTRACT: &str = "No abstract available";

pub struct ExcerptSummarizer {
    /// Bullet lines per summary (default 3)
    pub max_bullets: usize,
    /// Characters per bullet before truncation (default 200)
    pub max_bullet_chars: usize,
}

impl Default for ExcerptSummarizer {
    fn default() -> Self {
        Self {
            max_bullets: 3,
            max_bullet_chars: 200,
        }
    }
}

/// Split on sentence-ending punctuation followed by whitespace.
fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
            if !sentence.is_empty() {
                out.push(sentence);
            }
            current.clear();
        }
    }

    let rest = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

#[async_trait]
impl Summarizer for ExcerptSummarizer {
    async fn summarize(&self, paper: &PaperRecord) -> Result<String> {
        let abstract_text = sanitize_input(
            paper.abstract_text.as_deref().unwrap_or_default(),
            MAX_ABSTRACT_LENGTH,
        );
        let bullets: Vec<String> = sentences(&abstract_text)
            .into_iter()
            .take(self.max_bullets)
            .map(|s| format!("• {}", truncate_chars(&s, self.max_bullet_chars)))
            .collect();

        if bullets.is_empty() {
            return Ok(format!("• {NO_ABSTRACT}"));
        }
        Ok(bullets.join("\n"))
    }
}
