use std::env;
use std::str::FromStr;

use anyhow::Result;
use tracing::warn;

use crate::scoring::paper::{ScoreWeights, CATEGORY_BOOST};
use crate::semantic_scholar::client::DEFAULT_API_URL;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    pub db_path: String,
    /// Semantic Scholar Graph API base URL.
    pub api_url: String,
    /// Optional API key, sent as `x-api-key`. Raises the shared rate limit.
    pub api_key: String,
    /// Publication window for fetching, and age limit for the digest batch.
    pub lookback_days: i64,
    /// Search page size per field.
    pub limit_per_field: u32,
    /// Papers per digest.
    pub top_n: usize,
    /// A paper is not sent to the same subscriber twice inside this window.
    pub resend_days: i64,
    /// Overrides the category boost in the score formula.
    pub category_boost: f64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default; a value that doesn't parse is replaced by
    /// its default with a warning rather than failing the run.
    pub fn load() -> Result<Self> {
        Ok(Self {
            db_path: env::var("EVERYMORNING_DB_PATH")
                .unwrap_or_else(|_| "./everymorning.db".to_string()),
            api_url: env::var("SEMANTIC_SCHOLAR_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: env::var("SEMANTIC_SCHOLAR_API_KEY").unwrap_or_default(),
            lookback_days: parse_or("EVERYMORNING_LOOKBACK_DAYS", 7),
            limit_per_field: parse_or("EVERYMORNING_LIMIT_PER_FIELD", 50),
            top_n: parse_or("EVERYMORNING_TOP_N", 3),
            resend_days: parse_or("EVERYMORNING_RESEND_DAYS", 7),
            category_boost: parse_or("EVERYMORNING_CATEGORY_BOOST", CATEGORY_BOOST),
        })
    }

    /// Score weights with the configured category boost.
    pub fn score_weights(&self) -> ScoreWeights {
        ScoreWeights::with_category_boost(self.category_boost)
    }

    /// Check the literature API settings before a fetch.
    pub fn require_api(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!(
                "SEMANTIC_SCHOLAR_API_URL must be an http(s) URL, got '{}'.\n\
                 Unset it to use {DEFAULT_API_URL}.",
                self.api_url
            );
        }
        if self.api_key.is_empty() {
            warn!("SEMANTIC_SCHOLAR_API_KEY not set; using the shared unauthenticated rate limit");
        }
        Ok(())
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}
