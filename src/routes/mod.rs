pub mod dives;
pub mod health;
pub mod spots;
pub mod tides;

use std::sync::Arc;

use crate::db::DiveStore;
use crate::services::marine::MarineConditionsFetcher;
use crate::services::tide_station::TideStationResolver;
use crate::services::tides::TidePredictionFetcher;

/// Shared application state, built once per process.
#[derive(Clone)]
pub struct AppState {
    pub dives: Arc<dyn DiveStore>,
    pub marine: Arc<MarineConditionsFetcher>,
    pub stations: Arc<TideStationResolver>,
    pub tides: Arc<TidePredictionFetcher>,
}
