//! The static community catalog and nearby-community ranking.
//!
//! The catalog is process-lifetime read-only state, built once at startup
//! (from the embedded dataset or a configured JSON file) and injected into
//! `AppState` - handlers never reach for an ambient global, and tests build
//! their own small catalogs.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::models::{Community, CommunitySummary, NearbyCommunity};

use super::{centroid, haversine_km, round_km};

/// Default number of nearby communities returned.
pub const DEFAULT_NEARBY_LIMIT: usize = 5;

/// Counties forming the home metro region.
///
/// When a target community sits in one of these, candidates outside the set
/// are excluded from its nearby list. This keeps a different metro's
/// communities from showing up as "nearby" just because the catalog carries
/// both regions.
pub const REGIONAL_COUNTIES: [&str; 3] = ["Travis", "Williamson", "Hays"];

/// Community catalog embedded at build time.
const EMBEDDED_CATALOG: &str = include_str!("../../data/communities.json");

/// Read-only catalog of communities with boundary polygons.
#[derive(Debug, Clone)]
pub struct CommunityCatalog {
    communities: Vec<Community>,
}

impl CommunityCatalog {
    /// Build a catalog from parsed communities, rejecting degenerate
    /// polygons (fewer than three vertices).
    pub fn new(communities: Vec<Community>) -> AppResult<Self> {
        for community in &communities {
            if community.polygon.len() < 3 {
                return Err(AppError::ConfigError(format!(
                    "Community '{}' has a degenerate polygon ({} vertices, need at least 3)",
                    community.slug,
                    community.polygon.len()
                )));
            }
        }

        Ok(Self { communities })
    }

    /// Parse a catalog from JSON.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let communities: Vec<Community> = serde_json::from_str(json)?;
        Self::new(communities)
    }

    /// Load a catalog from a JSON file on disk.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read community catalog {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    /// The catalog compiled into the binary.
    pub fn embedded() -> AppResult<Self> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Number of catalog entries (duplicates included).
    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Look up a community by slug. Returns the first entry when the
    /// source carries duplicates.
    pub fn get(&self, slug: &str) -> Option<&Community> {
        self.communities.iter().find(|c| c.slug == slug)
    }

    /// Summaries of every distinct community, in catalog order.
    pub fn summaries(&self) -> Vec<CommunitySummary> {
        let mut seen = HashSet::new();
        self.communities
            .iter()
            .filter(|c| seen.insert(c.slug.clone()))
            .map(CommunitySummary::from)
            .collect()
    }

    /// Rank communities by proximity to the one identified by `slug`.
    ///
    /// Returns up to `limit` entries ordered nearest first:
    ///
    /// 1. Unknown slug: empty result.
    /// 2. The target itself is excluded.
    /// 3. If the target's county is in [`REGIONAL_COUNTIES`], candidates
    ///    outside that set are excluded (cross-metro filter).
    /// 4. Distance is the haversine between polygon centroids, rounded to
    ///    one decimal.
    /// 5. Stable ascending sort (catalog order breaks ties), de-duplicated
    ///    by slug keeping the first entry, then truncated.
    pub fn nearby(&self, slug: &str, limit: usize) -> Vec<NearbyCommunity> {
        let Some(target) = self.get(slug) else {
            return Vec::new();
        };
        let Some(origin) = centroid(&target.polygon) else {
            return Vec::new();
        };

        let target_is_regional = is_regional(&target.county);

        let mut ranked: Vec<NearbyCommunity> = self
            .communities
            .iter()
            .filter(|candidate| candidate.slug != slug)
            .filter(|candidate| !target_is_regional || is_regional(&candidate.county))
            .filter_map(|candidate| {
                centroid(&candidate.polygon).map(|center| NearbyCommunity {
                    name: candidate.name.clone(),
                    slug: candidate.slug.clone(),
                    county: candidate.county.clone(),
                    distance_km: round_km(haversine_km(&origin, &center)),
                })
            })
            .collect();

        // Stable sort: ties keep catalog order.
        ranked.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut seen = HashSet::new();
        ranked.retain(|candidate| seen.insert(candidate.slug.clone()));
        ranked.truncate(limit);
        ranked
    }
}

/// Whether a county belongs to the home metro region.
fn is_regional(county: &str) -> bool {
    REGIONAL_COUNTIES
        .iter()
        .any(|regional| regional.eq_ignore_ascii_case(county))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    /// A small square polygon (open ring) centered on the given point.
    fn square_around(longitude: f64, latitude: f64) -> Vec<GeoPoint> {
        let d = 0.01;
        vec![
            GeoPoint::new(longitude - d, latitude - d),
            GeoPoint::new(longitude + d, latitude - d),
            GeoPoint::new(longitude + d, latitude + d),
            GeoPoint::new(longitude - d, latitude + d),
        ]
    }

    fn community(name: &str, slug: &str, county: &str, lon: f64, lat: f64) -> Community {
        Community {
            name: name.to_string(),
            slug: slug.to_string(),
            county: county.to_string(),
            polygon: square_around(lon, lat),
        }
    }

    fn test_catalog() -> CommunityCatalog {
        CommunityCatalog::new(vec![
            community("Mueller", "mueller", "Travis", -97.703, 30.298),
            community("Whisper Valley", "whisper-valley", "Travis", -97.594, 30.282),
            community("Avery Ranch", "avery-ranch", "Williamson", -97.776, 30.468),
            community("Sunfield", "sunfield", "Hays", -97.822, 30.062),
            community("Alamo Ranch", "alamo-ranch", "Bexar", -98.714, 29.452),
        ])
        .unwrap()
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let result = CommunityCatalog::new(vec![Community {
            name: "Broken".to_string(),
            slug: "broken".to_string(),
            county: "Travis".to_string(),
            polygon: vec![GeoPoint::new(-97.7, 30.3), GeoPoint::new(-97.6, 30.3)],
        }]);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("degenerate polygon")
        );
    }

    #[test]
    fn test_embedded_catalog_parses() {
        let catalog = CommunityCatalog::embedded().unwrap();
        assert!(!catalog.is_empty());
        assert!(catalog.get("mueller").is_some());
    }

    #[test]
    fn test_unknown_slug_returns_empty() {
        let catalog = test_catalog();
        assert!(catalog.nearby("no-such-community", 5).is_empty());
    }

    #[test]
    fn test_nearby_orders_by_ascending_distance() {
        let catalog = test_catalog();
        let nearby = catalog.nearby("mueller", 5);

        // Independently computed: Whisper Valley ~10.6 km, Avery Ranch
        // ~20.2 km, Sunfield ~28.6 km from Mueller's centroid.
        let slugs: Vec<&str> = nearby.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["whisper-valley", "avery-ranch", "sunfield"]);

        let distances: Vec<f64> = nearby.iter().map(|c| c.distance_km).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert!((distances[0] - 10.6).abs() <= 0.1);
        assert!((distances[1] - 20.2).abs() <= 0.1);
        assert!((distances[2] - 28.6).abs() <= 0.1);
    }

    #[test]
    fn test_cross_region_candidates_are_excluded() {
        let catalog = test_catalog();
        let nearby = catalog.nearby("mueller", 10);

        // Mueller is in Travis (regional), so the Bexar community must
        // never appear regardless of limit.
        assert!(nearby.iter().all(|c| c.slug != "alamo-ranch"));
    }

    #[test]
    fn test_non_regional_target_sees_all_candidates() {
        let catalog = test_catalog();
        let nearby = catalog.nearby("alamo-ranch", 10);

        // A target outside the regional set ranks against the full catalog.
        assert_eq!(nearby.len(), 4);
    }

    #[test]
    fn test_target_excluded_from_its_own_list() {
        let catalog = test_catalog();
        let nearby = catalog.nearby("mueller", 10);
        assert!(nearby.iter().all(|c| c.slug != "mueller"));
    }

    #[test]
    fn test_duplicate_slugs_are_deduplicated() {
        let mut communities = vec![
            community("Mueller", "mueller", "Travis", -97.703, 30.298),
            community("Avery Ranch", "avery-ranch", "Williamson", -97.776, 30.468),
        ];
        // The catalog source sometimes repeats an entry.
        communities.push(community(
            "Avery Ranch",
            "avery-ranch",
            "Williamson",
            -97.776,
            30.468,
        ));
        let catalog = CommunityCatalog::new(communities).unwrap();

        let nearby = catalog.nearby("mueller", 10);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].slug, "avery-ranch");
    }

    #[test]
    fn test_limit_truncates() {
        let catalog = test_catalog();
        let nearby = catalog.nearby("mueller", 1);

        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].slug, "whisper-valley");
    }

    #[test]
    fn test_distances_are_rounded_to_one_decimal() {
        let catalog = test_catalog();
        for candidate in catalog.nearby("mueller", 5) {
            let scaled = candidate.distance_km * 10.0;
            assert!(
                (scaled - scaled.round()).abs() < 1e-9,
                "distance {} not rounded",
                candidate.distance_km
            );
        }
    }

    #[test]
    fn test_summaries_deduplicate_and_keep_order() {
        let catalog = CommunityCatalog::new(vec![
            community("Mueller", "mueller", "Travis", -97.703, 30.298),
            community("Mueller", "mueller", "Travis", -97.703, 30.298),
            community("Sunfield", "sunfield", "Hays", -97.822, 30.062),
        ])
        .unwrap();

        let summaries = catalog.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].slug, "mueller");
        assert_eq!(summaries[1].slug, "sunfield");
    }
}
