mod crm;
mod mls;

pub use crm::CrmClient;
pub use mls::{MlsClient, MlsSearchResult};
