// Semantic Scholar Graph API client — paper search over HTTP.
//
// Only the `/paper/search` endpoint is used. Every request waits on the
// shared rate limiter first: the unauthenticated tier allows roughly one
// request per second across all callers.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::rate_limiter::RateLimiter;

/// Default Graph API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Fields requested for every paper.
pub const PAPER_FIELDS: &str =
    "paperId,title,abstract,authors,citationCount,influentialCitationCount,publicationDate,url";

/// Thin reqwest wrapper with a rate-limited GET helper.
pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: RateLimiter,
}

impl SemanticScholarClient {
    /// Create a client for the given base URL. An empty key means unauthenticated.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("everymorning/0.1 (daily-paper-digest)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
            // 1 request per second
            rate_limiter: RateLimiter::new(1.0),
        })
    }

    /// GET `{base_url}/{path}` and deserialize the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(path = path, "Semantic Scholar GET request");

        let mut request = self.client.get(&url).query(params);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Semantic Scholar request failed: {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Semantic Scholar {path} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize {path} response"))
    }

    /// One page of `/paper/search` results.
    pub async fn search_papers(
        &self,
        query: &str,
        limit: u32,
        published_since: &str,
    ) -> Result<Vec<ApiPaper>> {
        let limit = limit.to_string();
        let date_range = format!("{published_since}:");
        let response: SearchResponse = self
            .get(
                "paper/search",
                &[
                    ("query", query),
                    ("fields", PAPER_FIELDS),
                    ("limit", &limit),
                    ("publicationDateOrYear", &date_range),
                ],
            )
            .await?;
        Ok(response.data)
    }
}

// -- Serde types for /paper/search --

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<ApiPaper>,
}

/// A paper as the Graph API returns it. Every field may be null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPaper {
    #[serde(default)]
    pub paper_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authors: Vec<ApiAuthor>,
    #[serde(default)]
    pub citation_count: Option<i64>,
    #[serde(default)]
    pub influential_citation_count: Option<i64>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

/// The API sends `null` for some empty lists.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
