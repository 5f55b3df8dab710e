//! Client for the MLS listing-search provider.
//!
//! The provider is an opaque HTTP service: this client only knows the two
//! search endpoints, their JSON envelopes, and how to authenticate. All
//! transport concerns (timeouts, retries, backoff) live in the resilient
//! fetch layer underneath.

use reqwest::Method;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::fetch::{FetchError, ResilientClient};
use crate::models::{Listing, SearchFilters};

/// Wire envelope returned by the provider's search endpoints.
#[derive(Debug, Deserialize)]
pub struct MlsSearchResult {
    pub listings: Vec<Listing>,
    pub total: u64,
    /// Present only on NLP search: the provider's plain-language summary of
    /// how it interpreted the query. Untrusted; sanitize before display.
    #[serde(default)]
    pub summary: Option<String>,
}

/// MLS search provider client.
#[derive(Debug, Clone)]
pub struct MlsClient {
    fetch: ResilientClient,
    base_url: String,
    api_key: Option<String>,
}

impl MlsClient {
    pub fn new(fetch: ResilientClient, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Run a filtered listing search.
    #[instrument(skip(self, filters), fields(page = filters.page))]
    pub async fn search(&self, filters: &SearchFilters) -> AppResult<MlsSearchResult> {
        let builder = self
            .request(Method::POST, "/listings/search")
            .json(filters);

        self.execute_search(builder).await
    }

    /// Run a natural-language search with an already-validated prompt.
    #[instrument(skip(self, prompt))]
    pub async fn nlp_search(&self, prompt: &str) -> AppResult<MlsSearchResult> {
        let builder = self
            .request(Method::POST, "/search/nlp")
            .json(&serde_json::json!({ "query": prompt }));

        self.execute_search(builder).await
    }

    /// Liveness probe against the provider, used by the background health
    /// task. Any successful status counts; failures are not errors here.
    pub async fn probe(&self) -> bool {
        match self.fetch.execute(self.request(Method::GET, "/health")).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.fetch.request(method, &url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    async fn execute_search(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> AppResult<MlsSearchResult> {
        let response = self.fetch.execute(builder).await.map_err(map_fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            // Non-retryable statuses (and 5xx on POST) land here unchanged.
            return Err(AppError::Upstream {
                detail: format!("MLS provider returned HTTP {}", status.as_u16()),
                request_id: None,
            });
        }

        response
            .json::<MlsSearchResult>()
            .await
            .map_err(|e| AppError::Upstream {
                detail: format!("MLS provider returned an unreadable body: {e}"),
                request_id: None,
            })
    }
}

/// Convert a resilience-layer failure into the application error taxonomy.
pub(crate) fn map_fetch_error(error: FetchError) -> AppError {
    if error.is_timeout() {
        AppError::UpstreamTimeout(error.to_string())
    } else {
        AppError::Upstream {
            detail: error.to_string(),
            request_id: None,
        }
    }
}
