//! Client for the CRM lead-submission endpoint.
//!
//! Submission failures are returned to the handler as errors; the handler -
//! not this client - decides that visitors still see success. Keeping the
//! swallow policy out of the client means background jobs or admin tooling
//! reusing it get honest errors.

use reqwest::Method;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::fetch::ResilientClient;
use crate::models::LeadRequest;

use super::mls::map_fetch_error;

/// Wire response from the CRM after accepting a lead.
#[derive(Debug, Deserialize)]
struct CrmLeadResult {
    #[serde(default)]
    person_id: Option<String>,
}

/// CRM lead-submission client.
#[derive(Debug, Clone)]
pub struct CrmClient {
    fetch: ResilientClient,
    base_url: String,
    api_key: Option<String>,
}

impl CrmClient {
    pub fn new(fetch: ResilientClient, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Submit a validated lead, returning the CRM person ID when provided.
    ///
    /// Lead submission is a POST, so a transient 5xx from the CRM is never
    /// retried - resubmitting could create duplicate person records.
    /// Transport-level failures are still retried by the fetch layer.
    #[instrument(skip(self, lead), fields(form_type = %lead.form_type))]
    pub async fn submit_lead(&self, lead: &LeadRequest) -> AppResult<Option<String>> {
        let url = format!("{}/leads", self.base_url);
        let mut builder = self.fetch.request(Method::POST, &url).json(lead);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = self.fetch.execute(builder).await.map_err(map_fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream {
                detail: format!("CRM returned HTTP {}", status.as_u16()),
                request_id: None,
            });
        }

        let result = response
            .json::<CrmLeadResult>()
            .await
            .map_err(|e| AppError::Upstream {
                detail: format!("CRM returned an unreadable body: {e}"),
                request_id: None,
            })?;

        Ok(result.person_id)
    }
}
