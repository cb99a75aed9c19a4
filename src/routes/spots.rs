//! GET /api/nearby_spots?lat=..&lon=..[&radius_km=..]

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::identity::Caller;
use crate::services::geo::Coordinate;
use crate::services::nearby::{self, candidate_dives, NearbySpot, DEFAULT_RADIUS_KM};

/// Query parameters are taken as text so a bad value becomes a 400 with our
/// own message instead of axum's rejection.
#[derive(Debug, Deserialize, IntoParams)]
pub struct NearbyQuery {
    /// Latitude of the query point
    pub lat: Option<String>,
    /// Longitude of the query point
    pub lon: Option<String>,
    /// Search radius in km (default 100)
    pub radius_km: Option<String>,
}

fn parse_finite(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl NearbyQuery {
    fn origin(&self) -> Result<Coordinate, AppError> {
        match (parse_finite(self.lat.as_deref()), parse_finite(self.lon.as_deref())) {
            (Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)),
            _ => Err(AppError::BadRequest("lat/lon required".to_string())),
        }
    }

    fn radius_km(&self) -> Result<f64, AppError> {
        match self.radius_km.as_deref() {
            None => Ok(DEFAULT_RADIUS_KM),
            Some(raw) => parse_finite(Some(raw))
                .ok_or_else(|| AppError::BadRequest("radius_km must be a number".to_string())),
        }
    }
}

/// Nearby public dives (and the caller's own) with live marine conditions.
///
/// At most 8 spots, nearest first. A spot whose conditions could not be
/// fetched is still returned, with `live` set to null.
#[utoipa::path(
    get,
    path = "/api/nearby_spots",
    tag = "Spots",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Nearby spots, nearest first", body = Vec<NearbySpot>),
        (status = 400, description = "Missing or non-numeric lat/lon", body = ErrorResponse),
    )
)]
pub async fn get_nearby_spots(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbySpot>>, AppError> {
    let origin = params.origin()?;
    let radius_km = params.radius_km()?;

    let public = state.dives.public_dives().await?;
    let own = match caller.user_id() {
        Some(user_id) => state.dives.dives_owned_by(user_id).await?,
        None => Vec::new(),
    };

    let spots = nearby::nearby(
        origin,
        radius_km,
        candidate_dives(public, own),
        &state.marine,
    )
    .await;

    Ok(Json(spots))
}
