use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Default page number when the client omits it.
fn default_page() -> u32 {
    1
}

/// Default page size when the client omits it.
fn default_page_size() -> u32 {
    20
}

/// Sort orders recognized by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recently listed first (default)
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

/// Listing search filters.
///
/// Every recognized field is enumerated here with an explicit default;
/// unknown fields in the request body are rejected by serde rather than
/// silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchFilters {
    /// Minimum list price in whole dollars
    #[serde(default)]
    pub min_price: Option<u64>,
    /// Maximum list price in whole dollars
    #[serde(default)]
    pub max_price: Option<u64>,
    /// Minimum bedroom count
    #[serde(default)]
    pub beds_min: Option<u32>,
    /// Minimum bathroom count
    #[serde(default)]
    pub baths_min: Option<u32>,
    /// Free-text keyword query forwarded to the provider
    #[serde(default)]
    pub query: Option<String>,
    /// Optional bounding polygon restricting the geographic area
    #[serde(default)]
    pub polygon: Option<Vec<GeoPoint>>,
    /// 1-based page number (default: 1)
    #[serde(default = "default_page")]
    pub page: u32,
    /// Results per page (default: 20, capped by `PAGE_SIZE_CAP`)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Sort order (default: newest first)
    #[serde(default)]
    pub sort: SortOrder,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            min_price: None,
            max_price: None,
            beds_min: None,
            baths_min: None,
            query: None,
            polygon: None,
            page: default_page(),
            page_size: default_page_size(),
            sort: SortOrder::default(),
        }
    }
}

impl SearchFilters {
    /// Clamp pagination to sane bounds: page at least 1, page size between
    /// 1 and `cap`.
    pub fn clamp_pagination(mut self, cap: u32) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, cap);
        self
    }
}

/// A listing record as returned by the MLS provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Provider listing identifier
    pub mls_id: String,
    /// Street address
    pub address: String,
    pub city: String,
    /// List price in whole dollars
    pub price: u64,
    pub beds: u32,
    /// Bathroom count; half baths make this fractional
    pub baths: f64,
    #[serde(default)]
    pub sqft: Option<u32>,
    /// Provider status, e.g. "active", "pending"
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub listed_at: Option<DateTime<Utc>>,
}

/// Paged search response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub listings: Vec<Listing>,
    /// Total matches across all pages, as reported by the provider
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    /// Whether pages beyond this one exist
    pub has_more: bool,
}

impl SearchResponse {
    /// Assemble a page envelope, deriving `has_more` from the total count.
    pub fn paged(listings: Vec<Listing>, total: u64, page: u32, page_size: u32) -> Self {
        let has_more = u64::from(page) * u64::from(page_size) < total;
        Self {
            listings,
            total,
            page,
            page_size,
            has_more,
        }
    }
}

/// Natural-language search response: a result page plus the provider's
/// sanitized summary of how it interpreted the query.
#[derive(Debug, Clone, Serialize)]
pub struct NlpSearchResponse {
    #[serde(flatten)]
    pub results: SearchResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}
