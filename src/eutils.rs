//! NCBI E-utilities client.
//!
//! Two calls make up a query run:
//!
//! - `esearch.fcgi` (JSON) resolves a free-text PubMed query into an ordered
//!   list of PMIDs
//! - `efetch.fcgi` (XML) fetches the full records for those PMIDs
//!
//! Each call is made exactly once with its own timeout; failures are
//! reported to the caller and never retried.

use crate::error::{Result, ScoutError};
use crate::xml::{self, XmlNode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// E-utilities base URL
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";

/// Database queried on every call
pub const PUBMED_DATABASE: &str = "pubmed";

/// Result cap used when the requested one is out of range
pub const DEFAULT_RESULT_CAP: u32 = 5;

/// Largest accepted result cap
pub const MAX_RESULT_CAP: u32 = 10_000;

/// Characters of an error response body kept in error messages
const ERROR_BODY_EXCERPT: usize = 200;

/// Clamp a requested result cap into `1..=MAX_RESULT_CAP`.
///
/// Out-of-range values fall back to [`DEFAULT_RESULT_CAP`] rather than
/// being rejected.
pub fn clamp_result_cap(requested: i64) -> u32 {
    if requested <= 0 || requested > i64::from(MAX_RESULT_CAP) {
        warn!(
            requested = requested,
            fallback = DEFAULT_RESULT_CAP,
            "Invalid result cap, using default"
        );
        return DEFAULT_RESULT_CAP;
    }
    // In range, so the conversion cannot fail
    u32::try_from(requested).unwrap_or(DEFAULT_RESULT_CAP)
}

/// A PMID is valid when it is non-empty and all ASCII digits.
pub fn is_valid_pmid(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Connection settings for the E-utilities endpoints.
#[derive(Debug, Clone)]
pub struct EutilsConfig {
    /// Base URL the endpoint names are joined onto
    pub base_url: String,
    /// Entrez database name
    pub database: String,
    /// Timeout for the identifier search
    pub search_timeout: Duration,
    /// Timeout for the bulk record fetch
    pub fetch_timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            database: PUBMED_DATABASE.to_string(),
            search_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(60),
            user_agent: format!("pubscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EutilsConfig {
    /// Point the client at a different server (mirror or test double).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Identifiers returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// PMIDs in upstream relevance order
    pub ids: Vec<String>,
    /// Total number of matches reported upstream (informational)
    pub count: u64,
}

// === ESearch JSON Response Types ===

#[derive(Debug, Deserialize, Default)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize, Default)]
struct ESearchResult {
    #[serde(default)]
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
}

/// E-utilities client
pub struct EutilsClient {
    client: reqwest::Client,
    config: EutilsConfig,
    base_url: Url,
}

impl EutilsClient {
    /// Create a new client
    pub fn new(config: EutilsConfig) -> Result<Self> {
        // `Url::join` drops the last path segment unless it ends with '/'
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            ScoutError::Config(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ScoutError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Search PubMed and return the matching PMIDs plus the upstream total.
    ///
    /// Fails before any request if `query` is blank. `max_results` is
    /// clamped with [`clamp_result_cap`]. No matches is `Ok` with an empty
    /// id list.
    pub async fn search(&self, query: &str, max_results: i64) -> Result<SearchResult> {
        if query.trim().is_empty() {
            return Err(ScoutError::Validation("Query cannot be empty".to_string()));
        }

        let retmax = clamp_result_cap(max_results);
        let url = self.build_search_url(query, retmax)?;

        debug!(url = %url, "Sending esearch request");
        let body = self.get_text(url, self.config.search_timeout).await?;

        let data: ESearchResponse = serde_json::from_str(&body)
            .map_err(|e| ScoutError::Parse(format!("Failed to parse esearch response: {}", e)))?;
        let result = data.esearchresult;

        if let Some(message) = result.error.as_deref().filter(|m| !m.is_empty()) {
            warn!(query = query, error = message, "esearch reported an error");
        }

        let count = result
            .count
            .as_deref()
            .and_then(|c| c.trim().parse::<u64>().ok())
            .unwrap_or(0);

        info!(
            query = query,
            retmax = retmax,
            total = count,
            returned = result.idlist.len(),
            "Search completed"
        );

        Ok(SearchResult {
            ids: result.idlist,
            count,
        })
    }

    /// Ordered PMIDs for `query`; see [`EutilsClient::search`].
    pub async fn resolve_ids(&self, query: &str, max_results: i64) -> Result<Vec<String>> {
        Ok(self.search(query, max_results).await?.ids)
    }

    /// Fetch the full PubMed XML for `ids` and return the document root.
    ///
    /// Ids that are not all digits are dropped first; if none remain the
    /// call fails without touching the network.
    pub async fn fetch_records(&self, ids: &[String]) -> Result<XmlNode> {
        if ids.is_empty() {
            return Err(ScoutError::Validation(
                "No PMIDs provided for fetching article details".to_string(),
            ));
        }

        let valid: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| is_valid_pmid(id))
            .collect();

        if valid.is_empty() {
            return Err(ScoutError::Validation("No valid PMIDs found".to_string()));
        }

        if valid.len() != ids.len() {
            warn!(
                filtered = ids.len() - valid.len(),
                kept = valid.len(),
                "Filtered invalid PMIDs"
            );
        }

        let url = self.build_fetch_url(&valid)?;

        debug!(count = valid.len(), "Fetching article details");
        let body = self.get_text(url, self.config.fetch_timeout).await?;

        let root = xml::parse_document(&body)?;
        info!(count = valid.len(), root = %root.name, "Fetched and parsed article details");
        Ok(root)
    }

    /// Build the esearch URL
    fn build_search_url(&self, query: &str, retmax: u32) -> Result<Url> {
        let mut url = self.endpoint("esearch.fcgi")?;
        url.query_pairs_mut()
            .append_pair("db", &self.config.database)
            .append_pair("term", query)
            .append_pair("retmax", &retmax.to_string())
            .append_pair("retmode", "json");
        Ok(url)
    }

    /// Build the efetch URL
    fn build_fetch_url(&self, ids: &[&str]) -> Result<Url> {
        let mut url = self.endpoint("efetch.fcgi")?;
        url.query_pairs_mut()
            .append_pair("db", &self.config.database)
            .append_pair("id", &ids.join(","))
            .append_pair("retmode", "xml");
        Ok(url)
    }

    fn endpoint(&self, name: &str) -> Result<Url> {
        self.base_url
            .join(name)
            .map_err(|e| ScoutError::Config(format!("Invalid endpoint '{}': {}", name, e)))
    }

    /// GET `url` and return the body, turning non-2xx statuses into `Api` errors.
    async fn get_text(&self, url: Url, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, timed_out = e.is_timeout(), "Request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let excerpt: String = error_text.chars().take(ERROR_BODY_EXCERPT).collect();
            warn!(status = status.as_u16(), error = %excerpt, "API error");
            return Err(ScoutError::Api {
                code: status.as_u16(),
                message: format!("E-utilities error: {} - {}", status, excerpt.trim()),
            });
        }

        Ok(response.text().await?)
    }
}
