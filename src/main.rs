use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use everymorning::config::Config;
use everymorning::db::models::{PaperRecord, SubscriberPreference};
use everymorning::scoring::clock::{days_before, Clock, SystemClock};

/// everymorning: a daily digest of recently published STEM papers.
///
/// Fetches new papers, ranks them by early citation signals, and sends each
/// subscriber the few that matter most in their fields, with a short reason
/// and summary for every pick.
#[derive(Parser)]
#[command(name = "everymorning", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Fetch recently published papers from Semantic Scholar
    Fetch {
        /// Publication window in days (default: EVERYMORNING_LOOKBACK_DAYS)
        #[arg(long)]
        days: Option<i64>,

        /// Max papers per field (default: EVERYMORNING_LIMIT_PER_FIELD)
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Store papers from a JSON file (an array of paper records)
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Score the stored batch and show the ranking
    Rank {
        /// Number of papers to show (default: EVERYMORNING_TOP_N)
        #[arg(long)]
        top: Option<usize>,

        /// Take the top K of every field instead of a global top-N
        #[arg(long, conflicts_with_all = ["top", "fields"])]
        per_field: Option<usize>,

        /// Rank for a field preference, e.g. "cs,bio"
        #[arg(long)]
        fields: Option<String>,
    },

    /// Add a subscriber (or reactivate one with new preferences)
    Subscribe {
        #[command(flatten)]
        channel: Channel,

        /// Preferred fields, e.g. "cs,bio" (default: all fields)
        #[arg(long)]
        fields: Option<String>,
    },

    /// Deactivate a subscriber
    Unsubscribe {
        #[command(flatten)]
        channel: Channel,
    },

    /// Build and deliver today's digest to every active subscriber
    Digest {
        /// Papers per digest (default: EVERYMORNING_TOP_N)
        #[arg(long)]
        top: Option<usize>,

        /// Print digests without recording them as sent
        #[arg(long)]
        dry_run: bool,

        /// Write one markdown file per subscriber into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show database and run status
    Status,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Channel {
    /// Subscriber email address
    #[arg(long)]
    email: Option<String>,

    /// Subscriber Telegram chat id
    #[arg(long)]
    telegram: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("everymorning=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing everymorning database...");
            let config = Config::load()?;
            let db = everymorning::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext steps:");
            println!("  everymorning subscribe --email you@example.com --fields cs,bio");
            println!("  everymorning fetch");
        }

        Commands::Fetch { days, limit } => {
            let config = Config::load()?;
            config.require_api()?;
            let db = open_database(&config)?;

            let days = days.unwrap_or(config.lookback_days);
            let limit = limit.unwrap_or(config.limit_per_field);
            println!("Fetching papers published in the last {days} days...");

            let client = everymorning::semantic_scholar::client::SemanticScholarClient::new(
                &config.api_url,
                &config.api_key,
            )?;
            let source = everymorning::semantic_scholar::papers::SemanticScholarSource::new(
                client,
                Box::new(SystemClock),
            );

            let summary =
                everymorning::pipeline::fetch::run(&source, &db, days, limit, SystemClock.now())
                    .await?;

            println!("\n{}", "Fetch complete.".bold());
            println!("  Papers fetched: {}", summary.fetched);
            println!("  Papers stored:  {}", summary.stored);
        }

        Commands::Import { file } => {
            let config = Config::load()?;
            let db = everymorning::db::initialize_sqlite(&config.db_path)?;

            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let papers: Vec<PaperRecord> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of papers", file.display()))?;

            let stored = db
                .upsert_papers(everymorning::db::IMPORT_SOURCE, &papers, SystemClock.now())
                .await?;
            println!("Imported {stored} papers from {}", file.display());
        }

        Commands::Rank {
            top,
            per_field,
            fields,
        } => {
            let config = Config::load()?;
            let db = open_database(&config)?;
            let weights = config.score_weights();
            let now = SystemClock.now();

            let papers = db
                .get_recent_papers(days_before(now, config.lookback_days))
                .await?;
            let scored = everymorning::scoring::select::score_papers(&papers, now, &weights);
            let cache: Vec<(String, f64)> = scored
                .iter()
                .map(|sp| (sp.paper.id.clone(), sp.score))
                .collect();
            db.cache_scores(&cache).await?;

            let top = top.unwrap_or(config.top_n);
            let (heading, mut ranked) = match (per_field, fields) {
                (Some(k), _) => (
                    format!("Top {k} per field"),
                    everymorning::scoring::select::top_per_field(&papers, k, now, &weights),
                ),
                (None, Some(list)) => {
                    let preference = SubscriberPreference::parse_list(&list)?;
                    (
                        format!("Top {top} for {}", preference.to_list()),
                        everymorning::scoring::select::personalized_top_n(
                            &scored,
                            &preference,
                            top,
                        ),
                    )
                }
                (None, None) => {
                    let mut global = scored;
                    global.truncate(top);
                    (format!("Top {top}"), global)
                }
            };
            everymorning::scoring::select::attach_reasons(&mut ranked, now);

            everymorning::output::terminal::display_ranked_papers(
                &heading, &ranked, now, &weights,
            );
        }

        Commands::Subscribe { channel, fields } => {
            let config = Config::load()?;
            let db = open_database(&config)?;

            let preference = match fields.as_deref() {
                Some(list) => SubscriberPreference::parse_list(list)?,
                None => SubscriberPreference::default(),
            };
            let id = db
                .upsert_subscriber(
                    channel.email.as_deref(),
                    channel.telegram.as_deref(),
                    &preference,
                )
                .await?;

            let fields_display = if preference.is_empty() {
                "all fields".to_string()
            } else {
                preference.to_list()
            };
            println!("Subscriber #{id} active ({fields_display})");
        }

        Commands::Unsubscribe { channel } => {
            let config = Config::load()?;
            let db = open_database(&config)?;

            let removed = db
                .deactivate_subscriber(channel.email.as_deref(), channel.telegram.as_deref())
                .await?;
            if removed {
                println!("Subscriber deactivated.");
            } else {
                println!("No active subscriber matched.");
            }
        }

        Commands::Digest { top, dry_run, out } => {
            let config = Config::load()?;
            let db = open_database(&config)?;
            let now = SystemClock.now();

            let options = everymorning::pipeline::digest::DigestOptions {
                top_n: top.unwrap_or(config.top_n),
                lookback_days: config.lookback_days,
                resend_days: config.resend_days,
                dry_run,
                ..Default::default()
            };
            let summarizer = everymorning::summary::excerpt::ExcerptSummarizer::default();
            let sender: Box<dyn everymorning::delivery::traits::DigestSender> = match out {
                Some(dir) => Box::new(everymorning::delivery::file::MarkdownFileSender::new(
                    &dir,
                    &now.format("%Y-%m-%d").to_string(),
                )),
                None => Box::new(everymorning::delivery::terminal::TerminalSender),
            };

            let report = everymorning::pipeline::digest::run(
                &db,
                &summarizer,
                sender.as_ref(),
                &config.score_weights(),
                now,
                &options,
            )
            .await?;

            everymorning::output::terminal::display_delivery_report(&report, dry_run);
        }

        Commands::Status => {
            let config = Config::load()?;
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `everymorning init` to set up the database.");
                return Ok(());
            }
            let db = open_database(&config)?;
            everymorning::status::show(&db, &config.db_path).await?;
        }
    }

    Ok(())
}

/// Open the configured database (it must exist already).
fn open_database(config: &Config) -> Result<Arc<dyn everymorning::db::Database>> {
    everymorning::db::open_sqlite(&config.db_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_per_field_stands_alone() {
        assert!(Cli::try_parse_from(["everymorning", "rank", "--per-field", "2"]).is_ok());
        assert!(
            Cli::try_parse_from(["everymorning", "rank", "--per-field", "2", "--fields", "cs"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from(["everymorning", "rank", "--per-field", "2", "--top", "5"])
                .is_err()
        );
    }

    #[test]
    fn test_rank_fields_with_top() {
        let cli = Cli::try_parse_from(["everymorning", "rank", "--top", "5", "--fields", "cs,bio"])
            .unwrap();
        match cli.command {
            Commands::Rank {
                top,
                per_field,
                fields,
            } => {
                assert_eq!(top, Some(5));
                assert_eq!(per_field, None);
                assert_eq!(fields.as_deref(), Some("cs,bio"));
            }
            _ => panic!("expected rank"),
        }
    }
}
