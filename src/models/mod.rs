mod community;
mod lead;
mod listing;

pub use community::{Community, CommunitySummary, GeoPoint, NearbyCommunity};
pub use lead::{LeadRequest, LeadResponse};
pub use listing::{Listing, NlpSearchResponse, SearchFilters, SearchResponse, SortOrder};
