//! Tide series and high/low events for a station, cached per station id.
//!
//! Freshness is 10 minutes. A failed refresh of the hourly series falls back
//! to the last cached bundle (marked stale); high/low events degrade to an
//! empty list instead of failing the bundle.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::errors::{AppError, UpstreamError};
use crate::services::cache::{Cached, Clock, TtlCache};
use crate::services::noaa::{Interval, NoaaClient, PredictionRecord};
use crate::services::retry::{retry_with_policy, RetryPolicy};
use crate::services::tide_station::TideStation;

/// How long a station's series stays fresh.
pub const TIDE_TTL_MINUTES: i64 = 10;

/// History padding added to every hourly window so the chart has context.
const HOURLY_PADDING_HOURS: u32 = 6;

pub const UNAVAILABLE_MESSAGE: &str = "Tide data temporarily unavailable from NOAA.";

/// One hourly height sample (feet above MLLW).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TidePoint {
    /// GMT timestamp as returned by NOAA ("YYYY-MM-DD HH:MM")
    pub t: String,
    /// Height in feet
    pub v: f64,
}

/// NOAA high/low codes. Mixed semidiurnal stations report the higher of the
/// two daily highs as `HH` and the lower of the two lows as `LL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TideKind {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "HH")]
    HigherHigh,
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "LL")]
    LowerLow,
}

impl TideKind {
    fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "H" => Some(TideKind::High),
            "HH" => Some(TideKind::HigherHigh),
            "L" => Some(TideKind::Low),
            "LL" => Some(TideKind::LowerLow),
            _ => None,
        }
    }
}

/// A predicted high or low water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TideEvent {
    pub t: String,
    pub v: f64,
    #[serde(rename = "type")]
    pub kind: TideKind,
}

/// What the cache stores per station. Station labels are not cached.
#[derive(Debug, Clone, PartialEq)]
pub struct TideSeries {
    pub series: Vec<TidePoint>,
    pub hilo: Vec<TideEvent>,
}

/// Station metadata plus its series, as served to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct TideBundle {
    pub station: TideStation,
    pub series: Vec<TidePoint>,
    pub hilo: Vec<TideEvent>,
    pub stale: bool,
    pub point_count: usize,
}

impl TideBundle {
    fn assemble(station: TideStation, cached: Cached<TideSeries>) -> Self {
        let Cached { value, stale } = cached;
        Self {
            station,
            point_count: value.series.len(),
            series: value.series,
            hilo: value.hilo,
            stale,
        }
    }
}

fn to_points(rows: Vec<PredictionRecord>) -> Vec<TidePoint> {
    rows.into_iter()
        .filter_map(|r| Some(TidePoint { v: r.v?, t: r.t }))
        .collect()
}

fn to_events(rows: Vec<PredictionRecord>) -> Vec<TideEvent> {
    rows.into_iter()
        .filter_map(|r| {
            Some(TideEvent {
                v: r.v?,
                kind: TideKind::parse(r.kind.as_deref()?)?,
                t: r.t,
            })
        })
        .collect()
}

#[derive(Debug)]
pub struct TidePredictionFetcher {
    noaa: NoaaClient,
    cache: TtlCache<String, TideSeries>,
    hourly_policy: RetryPolicy,
    hilo_policy: RetryPolicy,
}

impl TidePredictionFetcher {
    pub fn new(noaa: NoaaClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            noaa,
            cache: TtlCache::new(Duration::minutes(TIDE_TTL_MINUTES), clock),
            hourly_policy: RetryPolicy::hourly_predictions(),
            hilo_policy: RetryPolicy::high_low_events(),
        }
    }

    /// Hourly heights, shrinking the window on gateway errors.
    pub async fn fetch_hourly(&self, station_id: &str) -> Result<Vec<TidePoint>, UpstreamError> {
        let rows = retry_with_policy(&self.hourly_policy, |hours| {
            self.noaa
                .predictions(station_id, Interval::Hourly, hours + HOURLY_PADDING_HOURS)
        })
        .await
        .inspect_err(|e| {
            tracing::warn!(
                "Hourly predictions for {} failed (up to {} attempts): {}",
                station_id,
                self.hourly_policy.max_total_attempts(),
                e
            )
        })?;
        Ok(to_points(rows))
    }

    /// High/low events; empty when NOAA can't provide them.
    pub async fn fetch_high_low(&self, station_id: &str) -> Vec<TideEvent> {
        match retry_with_policy(&self.hilo_policy, |hours| {
            self.noaa.predictions(station_id, Interval::HighLow, hours)
        })
        .await
        {
            Ok(rows) => to_events(rows),
            Err(e) => {
                tracing::warn!("High/low events for {} unavailable: {}", station_id, e);
                Vec::new()
            }
        }
    }

    async fn fetch_live(&self, station_id: &str) -> Result<TideSeries, UpstreamError> {
        let series = self.fetch_hourly(station_id).await?;
        let hilo = self.fetch_high_low(station_id).await;
        Ok(TideSeries { series, hilo })
    }

    /// Series for `station`, labelled with the given (current) metadata.
    pub async fn get_bundle(&self, station: TideStation) -> Result<TideBundle, AppError> {
        let station_id = station.id.clone();
        let cached = self
            .cache
            .get_or_fetch(station_id.clone(), || self.fetch_live(&station_id))
            .await
            .map_err(|e| {
                tracing::warn!("No live or cached tide data for {}: {}", station_id, e);
                AppError::ExternalServiceError(UNAVAILABLE_MESSAGE.to_string())
            })?;

        Ok(TideBundle::assemble(station, cached))
    }
}
