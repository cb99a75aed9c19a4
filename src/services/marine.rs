//! Open-Meteo marine client: live wind / wave / sea temperature near a spot.
//!
//! See: https://open-meteo.com/en/docs/marine-weather-api
//!
//! Only successful fetches are cached (15 minutes, keyed on a ~1 km grid).
//! A failure is returned to the caller and never served stale: "live"
//! conditions mean nothing once they are old.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::errors::UpstreamError;
use crate::helpers::opt_round_dp;
use crate::services::cache::{Clock, TtlCache};
use crate::services::geo::Coordinate;

const SERVICE: &str = "Open-Meteo";

/// Local timeout for a marine request.
const MARINE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(8);

/// How long a snapshot stays fresh.
pub const MARINE_TTL_MINUTES: i64 = 15;

/// Upstream wind speed to knots.
pub const WIND_TO_KNOTS: f64 = 0.539957;

const HOURLY_VARIABLES: [&str; 6] = [
    "wind_speed_10m",
    "wind_direction_10m",
    "wave_height",
    "wave_direction",
    "wave_period",
    "sea_surface_temperature",
];

/// Current marine conditions. Any field may be missing upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarineSnapshot {
    /// Wind speed in knots, 1 decimal
    pub wind_speed_kt: Option<f64>,
    /// Wind direction in degrees (0 = north)
    pub wind_dir: Option<f64>,
    /// Significant wave height in metres
    pub wave_height_m: Option<f64>,
    /// Wave direction in degrees
    pub wave_dir: Option<f64>,
    /// Wave period in seconds
    pub wave_period_s: Option<f64>,
    /// Sea-surface temperature in °C
    pub sst_c: Option<f64>,
}

/// Cache key: coordinate rounded to 2 decimals (~1.1 km).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey {
    lat_centi: i64,
    lon_centi: i64,
}

impl From<Coordinate> for GridKey {
    fn from(c: Coordinate) -> Self {
        Self {
            lat_centi: (c.lat * 100.0).round() as i64,
            lon_centi: (c.lon * 100.0).round() as i64,
        }
    }
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct MarineResponse {
    #[serde(default)]
    hourly: HourlySeries,
}

/// Arrays are index-aligned; entries may be null.
#[derive(Debug, Default, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    wave_height: Vec<Option<f64>>,
    #[serde(default)]
    wave_direction: Vec<Option<f64>>,
    #[serde(default)]
    wave_period: Vec<Option<f64>>,
    #[serde(default)]
    sea_surface_temperature: Vec<Option<f64>>,
}

/// The most recent sample of a series is the "current" value.
fn last(values: &[Option<f64>]) -> Option<f64> {
    values.last().copied().flatten()
}

impl HourlySeries {
    fn snapshot(&self) -> MarineSnapshot {
        MarineSnapshot {
            wind_speed_kt: opt_round_dp(last(&self.wind_speed_10m).map(|v| v * WIND_TO_KNOTS), 1),
            wind_dir: last(&self.wind_direction_10m),
            wave_height_m: last(&self.wave_height),
            wave_dir: last(&self.wave_direction),
            wave_period_s: last(&self.wave_period),
            sst_c: last(&self.sea_surface_temperature),
        }
    }
}

#[derive(Debug)]
pub struct MarineConditionsFetcher {
    client: reqwest::Client,
    api_url: String,
    cache: TtlCache<GridKey, MarineSnapshot>,
}

impl MarineConditionsFetcher {
    pub fn new(api_url: &str, clock: Arc<dyn Clock>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(MARINE_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            api_url: api_url.to_string(),
            cache: TtlCache::new(Duration::minutes(MARINE_TTL_MINUTES), clock),
        }
    }

    /// Current conditions at `coord`, from cache when fresh.
    pub async fn get(&self, coord: Coordinate) -> Result<MarineSnapshot, UpstreamError> {
        let key = GridKey::from(coord);
        if let Some(snapshot) = self.cache.get_fresh(&key).await {
            return Ok(snapshot);
        }

        let snapshot = self.fetch(coord).await?;
        self.cache.insert(key, snapshot.clone()).await;
        Ok(snapshot)
    }

    async fn fetch(&self, coord: Coordinate) -> Result<MarineSnapshot, UpstreamError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("latitude", coord.lat.to_string()),
                ("longitude", coord.lon.to_string()),
                ("hourly", HOURLY_VARIABLES.join(",")),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
            });
        }

        let body: MarineResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))?;

        Ok(body.hourly.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::ManualClock;
    use chrono::{DateTime, Utc};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn start() -> DateTime<Utc> {
        "2026-06-01T12:00:00Z".parse().unwrap()
    }

    fn fetcher_for(server: &MockServer) -> (MarineConditionsFetcher, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let fetcher =
            MarineConditionsFetcher::new(&format!("{}/v1/marine", server.uri()), clock.clone());
        (fetcher, clock)
    }

    fn marine_body() -> serde_json::Value {
        serde_json::json!({
            "latitude": 41.5,
            "longitude": -71.3,
            "hourly": {
                "time": ["2026-06-01T10:00", "2026-06-01T11:00"],
                "wind_speed_10m": [8.0, 10.0],
                "wind_direction_10m": [200.0, 210.0],
                "wave_height": [0.8, 0.9],
                "wave_direction": [170.0, 175.0],
                "wave_period": [6.1, 6.4],
                "sea_surface_temperature": [18.2, null]
            }
        })
    }

    #[test]
    fn test_grid_key_rounds_to_two_decimals() {
        assert_eq!(
            GridKey::from(Coordinate::new(41.5012, -71.3249)),
            GridKey::from(Coordinate::new(41.4968, -71.3201))
        );
        assert_ne!(
            GridKey::from(Coordinate::new(41.50, -71.32)),
            GridKey::from(Coordinate::new(41.52, -71.32))
        );
    }

    #[test]
    fn test_snapshot_takes_last_sample_and_converts_wind() {
        let body: MarineResponse = serde_json::from_value(marine_body()).unwrap();
        let snap = body.hourly.snapshot();
        assert_eq!(snap.wind_speed_kt, Some(5.4));
        assert_eq!(snap.wind_dir, Some(210.0));
        assert_eq!(snap.wave_height_m, Some(0.9));
        assert_eq!(snap.wave_period_s, Some(6.4));
        assert_eq!(snap.sst_c, None);
    }

    #[test]
    fn test_snapshot_with_missing_series() {
        let body: MarineResponse = serde_json::from_value(serde_json::json!({
            "hourly": {"wave_height": []}
        }))
        .unwrap();
        let snap = body.hourly.snapshot();
        assert_eq!(snap.wind_speed_kt, None);
        assert_eq!(snap.wave_height_m, None);
    }

    #[tokio::test]
    async fn test_get_sends_expected_query_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/marine"))
            .and(query_param("latitude", "41.5"))
            .and(query_param("longitude", "-71.3"))
            .and(query_param(
                "hourly",
                "wind_speed_10m,wind_direction_10m,wave_height,wave_direction,wave_period,sea_surface_temperature",
            ))
            .and(query_param("timezone", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(marine_body()))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, clock) = fetcher_for(&server);
        let first = fetcher.get(Coordinate::new(41.5, -71.3)).await.unwrap();
        assert_eq!(first.wind_speed_kt, Some(5.4));

        // Within TTL, same grid cell: no second request.
        clock.advance(Duration::minutes(14));
        let second = fetcher.get(Coordinate::new(41.5, -71.3)).await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/marine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(marine_body()))
            .expect(2)
            .mount(&server)
            .await;

        let (fetcher, clock) = fetcher_for(&server);
        fetcher.get(Coordinate::new(41.5, -71.3)).await.unwrap();
        clock.advance(Duration::minutes(15));
        fetcher.get(Coordinate::new(41.5, -71.3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_is_not_cached_or_served_stale() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/marine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(marine_body()))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, clock) = fetcher_for(&server);
        let coord = Coordinate::new(41.5, -71.3);
        fetcher.get(coord).await.unwrap();

        server.verify().await;
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/v1/marine"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        clock.advance(Duration::minutes(20));
        let err = fetcher.get(coord).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 500, .. }));
        // Still no cached success to hide behind: the next call goes upstream again.
        assert!(fetcher.get(coord).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/marine"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let (fetcher, _clock) = fetcher_for(&server);
        let err = fetcher.get(Coordinate::new(41.5, -71.3)).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed { .. }));
    }
}
