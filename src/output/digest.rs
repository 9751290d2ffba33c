// Digest formatting — plain text for terminals, markdown for files.

use crate::delivery::traits::Digest;
use crate::summary::{sanitize_input, MAX_TITLE_LENGTH};

pub const DIGEST_TITLE: &str = "everymorning - Daily STEM Paper Digest";

const RULE_WIDTH: usize = 40;

/// Plain-text digest, one block per paper.
pub fn format_digest_text(digest: &Digest) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![DIGEST_TITLE.to_string(), rule.clone()];

    for (i, entry) in digest.entries.iter().enumerate() {
        let paper = &entry.paper.paper;
        lines.push(String::new());
        lines.push(format!(
            "Paper #{}: {}",
            i + 1,
            sanitize_input(&paper.title, MAX_TITLE_LENGTH)
        ));
        lines.push("-".repeat(RULE_WIDTH));
        if let Some(reason) = &entry.paper.selection_reason {
            lines.push(reason.clone());
        }
        lines.push(entry.summary.clone());
        if let Some(url) = paper.url.as_deref().filter(|u| !u.is_empty()) {
            lines.push(format!("Read paper: {url}"));
        }
        lines.push(rule.clone());
    }

    lines.join("\n")
}

/// Markdown digest, for files.
pub fn format_digest_markdown(digest: &Digest, date: &str) -> String {
    let mut out = format!("# {DIGEST_TITLE}\n\n_{date}_\n");

    for (i, entry) in digest.entries.iter().enumerate() {
        let paper = &entry.paper.paper;
        let title = sanitize_input(&paper.title, MAX_TITLE_LENGTH);
        out.push('\n');
        match paper.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => out.push_str(&format!("## {}. [{}]({})\n\n", i + 1, title, url)),
            None => out.push_str(&format!("## {}. {}\n\n", i + 1, title)),
        }
        out.push_str(&format!(
            "{} · score {:.4}\n\n",
            paper.field.display_name(),
            entry.paper.score
        ));
        if let Some(reason) = &entry.paper.selection_reason {
            out.push_str(&format!("*{reason}*\n\n"));
        }
        out.push_str(&entry.summary);
        out.push('\n');
    }

    out
}
