//! Dive listing endpoints.
//!
//! - GET /api/public_dives
//! - GET /api/my_dives

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::AppState;
use crate::db::models::Dive;
use crate::db::PUBLIC_LISTING_LIMIT;
use crate::errors::{AppError, ErrorResponse};
use crate::identity::Caller;

/// A public dive as shown on the community map.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicDiveItem {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub notes: String,
}

impl From<Dive> for PublicDiveItem {
    fn from(d: Dive) -> Self {
        Self {
            id: d.id,
            name: d.name,
            lat: d.lat,
            lon: d.lon,
            notes: d.notes.unwrap_or_default(),
        }
    }
}

/// One of the caller's own dives.
#[derive(Debug, Serialize, ToSchema)]
pub struct MyDiveItem {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub notes: String,
    pub is_public: bool,
    /// Water temperature in °F, when logged
    pub water_temp_f: Option<i32>,
    /// Creation time (ISO 8601, no offset; fractional seconds when present)
    pub created_at: String,
}

impl From<Dive> for MyDiveItem {
    fn from(d: Dive) -> Self {
        Self {
            id: d.id,
            name: d.name,
            lat: d.lat,
            lon: d.lon,
            notes: d.notes.unwrap_or_default(),
            is_public: d.is_public,
            water_temp_f: d.water_temp_f,
            created_at: d.created_at.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }
}

/// List the newest public dives.
#[utoipa::path(
    get,
    path = "/api/public_dives",
    tag = "Dives",
    responses(
        (status = 200, description = "Newest public dives (max 2000)", body = Vec<PublicDiveItem>),
    )
)]
pub async fn list_public_dives(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicDiveItem>>, AppError> {
    let dives = state.dives.recent_public_dives(PUBLIC_LISTING_LIMIT).await?;
    Ok(Json(dives.into_iter().map(PublicDiveItem::from).collect()))
}

/// List the caller's own dives, newest first.
#[utoipa::path(
    get,
    path = "/api/my_dives",
    tag = "Dives",
    params(
        ("X-User-Id" = i64, Header, description = "Signed-in user id, set by the auth layer"),
    ),
    responses(
        (status = 200, description = "Caller's dives", body = Vec<MyDiveItem>),
        (status = 401, description = "No signed-in user", body = ErrorResponse),
    )
)]
pub async fn list_my_dives(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<MyDiveItem>>, AppError> {
    let user_id = caller
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Sign in to see your dives".to_string()))?;
    let dives = state.dives.dives_owned_by(user_id).await?;
    Ok(Json(dives.into_iter().map(MyDiveItem::from).collect()))
}
