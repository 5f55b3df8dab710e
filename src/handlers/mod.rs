mod communities;
mod health;
mod leads;
pub mod search;

pub use communities::{list_communities, nearby_communities};
pub use health::{health_check, readiness_check};
pub use leads::submit_lead;
pub use search::{nlp_search, search_listings};
