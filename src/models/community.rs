use serde::{Deserialize, Serialize};

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// A master-planned community in the static catalog.
///
/// The polygon is an open ring (no explicit closing point) with at least
/// three vertices; catalog loading rejects anything smaller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    /// Display name, e.g. "Avery Ranch"
    pub name: String,
    /// URL slug, unique per community (the catalog source may still carry
    /// duplicate entries for one slug)
    pub slug: String,
    /// County the community sits in, e.g. "Williamson"
    pub county: String,
    /// Boundary polygon as an open ring of (longitude, latitude) vertices
    pub polygon: Vec<GeoPoint>,
}

/// Catalog entry without the boundary polygon, for listing endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommunitySummary {
    pub name: String,
    pub slug: String,
    pub county: String,
}

impl From<&Community> for CommunitySummary {
    fn from(community: &Community) -> Self {
        Self {
            name: community.name.clone(),
            slug: community.slug.clone(),
            county: community.county.clone(),
        }
    }
}

/// A community ranked by proximity to a target community.
///
/// Derived on demand from the catalog polygons; never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NearbyCommunity {
    pub name: String,
    pub slug: String,
    pub county: String,
    /// Great-circle distance between centroids, rounded to one decimal.
    pub distance_km: f64,
}
