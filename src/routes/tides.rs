//! GET /api/tides?[station=..][&lat=..&lon=..][&max_km=..]

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::services::geo::Coordinate;
use crate::services::tide_station::{TideStation, DEFAULT_MAX_KM};
use crate::services::tides::{TideBundle, TideEvent, TidePoint};

#[derive(Debug, Deserialize, IntoParams)]
pub struct TideQuery {
    /// Explicit NOAA station id; takes precedence over lat/lon
    pub station: Option<String>,
    /// Latitude used to find the nearest station
    pub lat: Option<String>,
    /// Longitude used to find the nearest station
    pub lon: Option<String>,
    /// Maximum station distance in km (default 250)
    pub max_km: Option<String>,
}

/// Longest station id accepted. NOAA ids are 7 digits; subordinate and
/// current stations use short alphanumeric codes.
const MAX_STATION_ID_LEN: usize = 16;

fn parse_finite(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl TideQuery {
    /// The requested station id, if any. Empty means absent.
    fn station_id(&self) -> Result<Option<&str>, AppError> {
        let Some(id) = self.station.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        if id.len() > MAX_STATION_ID_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::BadRequest("invalid station id".to_string()));
        }
        Ok(Some(id))
    }

    /// Unusable coordinates are treated as absent.
    fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(
            parse_finite(self.lat.as_deref())?,
            parse_finite(self.lon.as_deref())?,
        ))
    }

    fn max_km(&self) -> Result<f64, AppError> {
        match self.max_km.as_deref() {
            None => Ok(DEFAULT_MAX_KM),
            Some(raw) => parse_finite(Some(raw))
                .ok_or_else(|| AppError::BadRequest("max_km must be a number".to_string())),
        }
    }
}

/// Station block of the tides response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StationResponse {
    #[serde(flatten)]
    pub station: TideStation,
    /// Number of hourly points in `series`
    pub point_count: usize,
    /// True when NOAA was unreachable and an expired cached series is served
    pub stale: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TideResponse {
    pub station: StationResponse,
    pub series: Vec<TidePoint>,
    pub hilo: Vec<TideEvent>,
}

impl From<TideBundle> for TideResponse {
    fn from(b: TideBundle) -> Self {
        Self {
            station: StationResponse {
                station: b.station,
                point_count: b.point_count,
                stale: b.stale,
            },
            series: b.series,
            hilo: b.hilo,
        }
    }
}

/// Tide predictions for a station.
///
/// With `station` the given id is used as-is. Otherwise the nearest station
/// to `lat`/`lon` within `max_km` is chosen, falling back to a regional
/// default (Newport, RI when no usable coordinate is given).
#[utoipa::path(
    get,
    path = "/api/tides",
    tag = "Tides",
    params(TideQuery),
    responses(
        (status = 200, description = "Hourly series and high/low events", body = TideResponse),
        (status = 400, description = "Invalid station id or non-numeric max_km", body = ErrorResponse),
        (status = 502, description = "NOAA unavailable and nothing cached", body = ErrorResponse),
    )
)]
pub async fn get_tides(
    State(state): State<AppState>,
    Query(params): Query<TideQuery>,
) -> Result<Json<TideResponse>, AppError> {
    let station_id = params.station_id()?;
    let max_km = params.max_km()?;
    let station = state
        .stations
        .station_for(station_id, params.coordinate(), max_km)
        .await;

    tracing::debug!("Serving tides for station {} ({})", station.id, station.name);
    let bundle = state.tides.get_bundle(station).await?;
    Ok(Json(TideResponse::from(bundle)))
}
