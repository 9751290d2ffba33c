// Colored terminal output for ranked paper lists and run summaries.
//
// This module handles all terminal-specific formatting: colors and tables.
// The main.rs command handlers delegate here.

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::db::models::ScoredPaper;
use crate::delivery::traits::DeliveryReport;
use crate::scoring::paper::{ScoreFactors, ScoreWeights};

/// Display a ranked paper list with the factor breakdown behind each score.
pub fn display_ranked_papers(
    heading: &str,
    papers: &[ScoredPaper],
    now: DateTime<Utc>,
    weights: &ScoreWeights,
) {
    if papers.is_empty() {
        println!("No papers to rank. Run `everymorning fetch` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== {heading} ({} papers) ===", papers.len()).bold()
    );
    println!();

    // Header
    println!(
        "  {:>4}  {:<48} {:>8}  {:<8} {:>6} {:>6} {:>6} {:>6}",
        "Rank".dimmed(),
        "Title".dimmed(),
        "Score".dimmed(),
        "Field".dimmed(),
        "Cites".dimmed(),
        "Vel".dimmed(),
        "Infl".dimmed(),
        "Rec".dimmed(),
    );
    println!("  {}", "-".repeat(104).dimmed());

    for (i, sp) in papers.iter().enumerate() {
        let factors = ScoreFactors::compute(&sp.paper, now, weights);
        println!(
            "  {:>4}. {:<48} {:>8}  {:<8} {:>6} {:>6.2} {:>6.2} {:>6.2}",
            i + 1,
            super::truncate_chars(&sp.paper.title, 45),
            colorize_score(sp.score),
            sp.paper.field.tag(),
            sp.paper.citation_count,
            factors.citation_velocity,
            factors.influential_ratio,
            factors.recency,
        );
        if let Some(reason) = &sp.selection_reason {
            println!("        {}", reason.cyan());
        }
    }
    println!();
}

/// Display the outcome of a digest run.
pub fn display_delivery_report(report: &DeliveryReport, dry_run: bool) {
    let heading = if dry_run {
        "=== Digest Dry Run ==="
    } else {
        "=== Digest Delivered ==="
    };
    println!("\n{}", heading.bold());
    println!("  Sent:    {}/{}", report.sent, report.total);
    if report.skipped > 0 {
        println!(
            "  {} {} subscribers had no papers in their fields",
            "~".yellow(),
            report.skipped
        );
    }
    if report.failed > 0 {
        println!("  {} {} deliveries failed", "!".red().bold(), report.failed);
    }
}

/// Colorize a score: velocity dominates, so anything above ~1 is moving.
fn colorize_score(score: f64) -> colored::ColoredString {
    let text = format!("{score:.4}");
    match score {
        s if s >= 5.0 => text.green().bold(),
        s if s >= 1.0 => text.green(),
        s if s >= 0.5 => text.yellow(),
        _ => text.dimmed(),
    }
}
