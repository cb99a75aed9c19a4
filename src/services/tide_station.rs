//! Nearest tide station resolution.
//!
//! Searches the NOAA directory in expanding boxes around the query point and
//! falls back to a fixed regional station when nothing usable turns up.
//! Resolution never fails.

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::round_dp;
use crate::services::geo::{distance_km, Coordinate};
use crate::services::noaa::{NoaaClient, StationRecord};

/// Box half-widths in degrees, tried in order.
const SEARCH_DELTAS_DEG: [f64; 3] = [0.5, 1.0, 2.5];

/// A candidate further than this in both latitude and longitude is treated
/// as a directory data error.
const SANITY_GUARD_DEG: f64 = 10.0;

/// Default `max_km` when the caller does not supply one.
pub const DEFAULT_MAX_KM: f64 = 250.0;

/// Resolved tide station metadata.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TideStation {
    /// NOAA station id (e.g. "8452660")
    pub id: String,
    /// Display name
    pub name: String,
    /// State / region label, empty when unknown
    pub state: String,
    /// Station latitude, null when metadata lookup failed
    pub lat: Option<f64>,
    /// Station longitude, null when metadata lookup failed
    pub lon: Option<f64>,
    /// Distance from the query point in km; null unless found by search
    pub distance_km: Option<f64>,
}

impl TideStation {
    fn regional(id: &str, name: &str, state: &str, lat: f64, lon: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            state: state.to_string(),
            lat: Some(lat),
            lon: Some(lon),
            distance_km: None,
        }
    }

    /// Newport, RI: the East Coast default and the global fallback.
    pub fn newport() -> Self {
        Self::regional("8452660", "Newport, RI", "RI", 41.504, -71.326)
    }

    pub fn galveston() -> Self {
        Self::regional("8771450", "Galveston Pier 21, TX", "TX", 29.31, -94.79)
    }

    pub fn san_francisco() -> Self {
        Self::regional("9414290", "San Francisco, CA", "CA", 37.806, -122.465)
    }

    /// Label used when a station's metadata cannot be fetched.
    pub fn placeholder(station_id: &str) -> Self {
        Self {
            id: station_id.to_string(),
            name: format!("NOAA Station {}", station_id),
            state: String::new(),
            lat: None,
            lon: None,
            distance_km: None,
        }
    }

    fn from_record(record: StationRecord, distance_km: Option<f64>, default_name: &str) -> Self {
        Self {
            name: record.name.unwrap_or_else(|| default_name.to_string()),
            state: record.state.unwrap_or_default(),
            lat: record.coordinate.map(|c| c.lat),
            lon: record.coordinate.map(|c| c.lon),
            id: record.id,
            distance_km,
        }
    }
}

/// Fixed station for a coordinate band (continental US coasts), Newport
/// everywhere else.
pub fn regional_default(coord: Option<Coordinate>) -> TideStation {
    let Some(Coordinate { lat, lon }) = coord.filter(Coordinate::is_finite) else {
        return TideStation::newport();
    };

    if (-90.0..=-60.0).contains(&lon) && (25.0..=50.0).contains(&lat) {
        TideStation::newport()
    } else if (-105.0..-90.0).contains(&lon) && (25.0..=35.0).contains(&lat) {
        TideStation::galveston()
    } else if (-125.0..-105.0).contains(&lon) && (30.0..=50.0).contains(&lat) {
        TideStation::san_francisco()
    } else {
        TideStation::newport()
    }
}

/// Pick the nearest active station, or the nearest of any status if none is
/// active. Stations without coordinates are ignored.
fn nearest_candidate(origin: Coordinate, stations: Vec<StationRecord>) -> Option<(StationRecord, f64)> {
    let with_distance: Vec<(StationRecord, f64)> = stations
        .into_iter()
        .filter_map(|s| {
            let d = distance_km(origin, s.coordinate?);
            d.is_finite().then_some((s, d))
        })
        .collect();

    let closest = |active_only: bool| {
        with_distance
            .iter()
            .filter(|(s, _)| !active_only || s.is_active())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .cloned()
    };

    closest(true).or_else(|| closest(false))
}

/// Whether a candidate is close enough to be used.
fn accept_candidate(origin: Coordinate, station: &StationRecord, distance: f64, max_km: f64) -> bool {
    if distance > max_km {
        return false;
    }
    match station.coordinate {
        Some(c) => {
            !((c.lat - origin.lat).abs() > SANITY_GUARD_DEG
                && (c.lon - origin.lon).abs() > SANITY_GUARD_DEG)
        }
        None => true,
    }
}

/// Resolves coordinates (or explicit ids) to tide stations.
#[derive(Debug, Clone)]
pub struct TideStationResolver {
    noaa: NoaaClient,
}

impl TideStationResolver {
    pub fn new(noaa: NoaaClient) -> Self {
        Self { noaa }
    }

    /// Closest usable station within `max_km` of `coord`, else the regional
    /// default for `coord`.
    pub async fn resolve(&self, coord: Option<Coordinate>, max_km: f64) -> TideStation {
        let Some(origin) = coord.filter(Coordinate::is_finite) else {
            return TideStation::newport();
        };

        for delta in SEARCH_DELTAS_DEG {
            let stations = match self.noaa.stations_in_bbox(origin, delta).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Station search (±{}°) failed: {}", delta, e);
                    continue;
                }
            };
            if stations.is_empty() {
                continue;
            }

            let Some((best, best_d)) = nearest_candidate(origin, stations) else {
                continue;
            };
            if !accept_candidate(origin, &best, best_d, max_km) {
                tracing::debug!(
                    "Rejected station {} at {:.1} km (±{}° search)",
                    best.id,
                    best_d,
                    delta
                );
                continue;
            }

            return TideStation::from_record(best, Some(round_dp(best_d, 2)), "NOAA Station");
        }

        let fallback = regional_default(Some(origin));
        tracing::debug!(
            "No station found near ({}, {}), using regional default {}",
            origin.lat,
            origin.lon,
            fallback.id
        );
        fallback
    }

    /// Metadata for an explicitly requested station; a placeholder on failure.
    pub async fn lookup(&self, station_id: &str) -> TideStation {
        match self.noaa.station_detail(station_id).await {
            Ok(record) => {
                let default_name = format!("NOAA Station {}", station_id);
                TideStation::from_record(record, None, &default_name)
            }
            Err(e) => {
                tracing::warn!("Station metadata lookup for {} failed: {}", station_id, e);
                TideStation::placeholder(station_id)
            }
        }
    }

    /// Explicit station id wins; otherwise resolve from the coordinate.
    pub async fn station_for(
        &self,
        station_id: Option<&str>,
        coord: Option<Coordinate>,
        max_km: f64,
    ) -> TideStation {
        match station_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => self.lookup(id).await,
            None => self.resolve(coord, max_km).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_for(server: &MockServer) -> TideStationResolver {
        TideStationResolver::new(NoaaClient::new(
            &format!("{}/mdapi", server.uri()),
            &format!("{}/datagetter", server.uri()),
            "LagoonLinkTest",
        ))
    }

    async fn mount_stations(server: &MockServer, stations: serde_json::Value, times: u64) {
        Mock::given(method("GET"))
            .and(path("/mdapi/stations.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "stations": stations })),
            )
            .expect(times)
            .mount(server)
            .await;
    }

    fn record(id: &str, lat: f64, lon: f64, status: Option<&str>) -> StationRecord {
        StationRecord {
            id: id.to_string(),
            name: Some(format!("Station {}", id)),
            state: None,
            coordinate: Some(Coordinate::new(lat, lon)),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_regional_bands() {
        assert_eq!(regional_default(Some(Coordinate::new(41.0, -71.5))).id, "8452660");
        assert_eq!(regional_default(Some(Coordinate::new(29.0, -95.0))).id, "8771450");
        assert_eq!(regional_default(Some(Coordinate::new(37.0, -122.0))).id, "9414290");
        assert_eq!(regional_default(Some(Coordinate::new(-33.8, 151.2))).id, "8452660");
        assert_eq!(regional_default(None).id, "8452660");
        assert_eq!(
            regional_default(Some(Coordinate::new(f64::NAN, -95.0))).id,
            "8452660"
        );
    }

    #[test]
    fn test_regional_defaults_have_no_distance() {
        assert_eq!(regional_default(Some(Coordinate::new(29.0, -95.0))).distance_km, None);
    }

    #[test]
    fn test_nearest_prefers_active() {
        let origin = Coordinate::new(41.5, -71.3);
        let stations = vec![
            record("near-inactive", 41.5, -71.31, Some("inactive")),
            record("far-active", 41.9, -71.3, Some("active")),
        ];
        let (best, _) = nearest_candidate(origin, stations).unwrap();
        assert_eq!(best.id, "far-active");
    }

    #[test]
    fn test_nearest_falls_back_to_any_status() {
        let origin = Coordinate::new(41.5, -71.3);
        let stations = vec![
            record("b", 42.0, -71.3, None),
            record("a", 41.6, -71.3, Some("retired")),
        ];
        let (best, _) = nearest_candidate(origin, stations).unwrap();
        assert_eq!(best.id, "a");
    }

    #[test]
    fn test_sanity_guard_needs_both_axes() {
        let origin = Coordinate::new(0.0, 0.0);
        let lon_only = record("x", 2.0, 15.0, None);
        let both = record("y", 11.0, 11.0, None);
        assert!(accept_candidate(origin, &lon_only, 100.0, 250.0));
        assert!(!accept_candidate(origin, &both, 100.0, 250.0));
    }

    #[tokio::test]
    async fn test_resolve_returns_nearest_active_station() {
        let server = MockServer::start().await;
        mount_stations(
            &server,
            serde_json::json!([
                {"id": "8452660", "name": "Newport", "state": "RI",
                 "lat": 41.5043, "lng": -71.3261, "status": "active"},
                {"id": "8447386", "name": "Fall River", "state": "MA",
                 "lat": 41.7043, "lng": -71.1641, "status": "active"}
            ]),
            1,
        )
        .await;

        let station = resolver_for(&server)
            .resolve(Some(Coordinate::new(41.49, -71.33)), DEFAULT_MAX_KM)
            .await;

        assert_eq!(station.id, "8452660");
        assert_eq!(station.name, "Newport");
        let d = station.distance_km.unwrap();
        assert!(d > 0.0 && d < 5.0, "got {}", d);
        // Rounded to 2 decimals
        assert_eq!(d, round_dp(d, 2));
    }

    #[tokio::test]
    async fn test_resolve_expands_then_falls_back_to_region() {
        let server = MockServer::start().await;
        mount_stations(&server, serde_json::json!([]), 3).await;

        let station = resolver_for(&server)
            .resolve(Some(Coordinate::new(29.0, -95.0)), DEFAULT_MAX_KM)
            .await;

        assert_eq!(station.id, "8771450");
        assert_eq!(station.distance_km, None);
    }

    #[tokio::test]
    async fn test_resolve_rejects_station_beyond_max_km() {
        let server = MockServer::start().await;
        mount_stations(
            &server,
            serde_json::json!([
                {"id": "9410170", "name": "San Diego", "state": "CA",
                 "lat": 32.714, "lng": -117.174, "status": "active"}
            ]),
            3,
        )
        .await;

        let station = resolver_for(&server)
            .resolve(Some(Coordinate::new(37.0, -122.0)), 10.0)
            .await;

        assert_eq!(station.id, "9414290");
    }

    #[tokio::test]
    async fn test_resolve_survives_directory_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mdapi/stations.json"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let station = resolver_for(&server)
            .resolve(Some(Coordinate::new(41.0, -71.5)), DEFAULT_MAX_KM)
            .await;
        assert_eq!(station.id, "8452660");
    }

    #[tokio::test]
    async fn test_resolve_without_coordinate_is_newport() {
        let server = MockServer::start().await;
        mount_stations(&server, serde_json::json!([]), 0).await;

        let station = resolver_for(&server).resolve(None, DEFAULT_MAX_KM).await;
        assert_eq!(station, TideStation::newport());
    }

    #[tokio::test]
    async fn test_lookup_failure_gives_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mdapi/stations/1234567.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let station = resolver_for(&server).lookup("1234567").await;
        assert_eq!(station.name, "NOAA Station 1234567");
        assert_eq!(station.state, "");
        assert_eq!(station.lat, None);
        assert_eq!(station.lon, None);
    }

    #[tokio::test]
    async fn test_station_for_prefers_explicit_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mdapi/stations/8771450.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "stations": {"id": "8771450", "name": "Galveston Pier 21", "state": "TX",
                             "lat": 29.31, "lng": -94.7933}
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_stations(&server, serde_json::json!([]), 0).await;

        let station = resolver_for(&server)
            .station_for(Some("8771450"), Some(Coordinate::new(41.0, -71.5)), DEFAULT_MAX_KM)
            .await;
        assert_eq!(station.name, "Galveston Pier 21");
        assert_eq!(station.distance_km, None);
    }
}
