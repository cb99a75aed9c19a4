pub mod cache;
pub mod geo;
pub mod marine;
pub mod nearby;
pub mod noaa;
pub mod retry;
pub mod tide_station;
pub mod tides;
