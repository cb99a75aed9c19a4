//! Nearby dive spots with live marine conditions.

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::db::models::Dive;
use crate::helpers::round_dp;
use crate::services::geo::{distance_km, Coordinate};
use crate::services::marine::{MarineConditionsFetcher, MarineSnapshot};

/// Upper bound on spots returned.
pub const MAX_NEARBY_SPOTS: usize = 8;

/// Search radius when the caller gives none.
pub const DEFAULT_RADIUS_KM: f64 = 100.0;

/// A dive site near the query point.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NearbySpot {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Distance from the query point, 1 decimal
    pub distance_km: f64,
    pub notes: String,
    pub is_public: bool,
    /// Live conditions, null when the marine provider had nothing
    pub live: Option<MarineSnapshot>,
}

/// Public dives plus the caller's own, each id once. The public copy wins.
pub fn candidate_dives(public: Vec<Dive>, own: Vec<Dive>) -> Vec<Dive> {
    let mut seen = HashSet::new();
    public
        .into_iter()
        .chain(own)
        .filter(|d| seen.insert(d.id))
        .collect()
}

/// Candidates within `radius_km`, nearest first, at most [`MAX_NEARBY_SPOTS`].
///
/// Distances are rounded before sorting; ties keep candidate order.
pub fn rank_within_radius(
    origin: Coordinate,
    radius_km: f64,
    candidates: Vec<Dive>,
) -> Vec<(Dive, f64)> {
    let mut ranked: Vec<(Dive, f64)> = candidates
        .into_iter()
        .filter_map(|d| {
            let dist = distance_km(origin, d.coordinate());
            (dist <= radius_km).then(|| (d, round_dp(dist, 1)))
        })
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(MAX_NEARBY_SPOTS);
    ranked
}

/// Rank candidates and attach live conditions to each kept spot.
///
/// Only the spots that survive the cap are enriched; marine lookups run
/// concurrently and a failed lookup leaves `live` empty.
pub async fn nearby(
    origin: Coordinate,
    radius_km: f64,
    candidates: Vec<Dive>,
    marine: &MarineConditionsFetcher,
) -> Vec<NearbySpot> {
    let ranked = rank_within_radius(origin, radius_km, candidates);

    let lookups = ranked.iter().map(|(dive, _)| async move {
        match marine.get(dive.coordinate()).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!("No live conditions for dive {}: {}", dive.id, e);
                None
            }
        }
    });
    let live = join_all(lookups).await;

    ranked
        .into_iter()
        .zip(live)
        .map(|((dive, distance_km), live)| NearbySpot {
            id: dive.id,
            name: dive.name,
            lat: dive.lat,
            lon: dive.lon,
            distance_km,
            notes: dive.notes.unwrap_or_default(),
            is_public: dive.is_public,
            live,
        })
        .collect()
}
