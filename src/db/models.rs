use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::services::geo::Coordinate;

/// A logged dive, read-only from this service's point of view.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Dive {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub notes: Option<String>,
    pub is_public: bool,
    /// Water temperature logged by the diver, °F
    pub water_temp_f: Option<i32>,
    pub created_at: NaiveDateTime,
}

impl Dive {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}
