//! NOAA CO-OPS client: station metadata and tide predictions.
//!
//! See: https://api.tidesandcurrents.noaa.gov/mdapi/prod/
//! and https://api.tidesandcurrents.noaa.gov/api/prod/

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::UpstreamError;
use crate::services::geo::Coordinate;

const SERVICE: &str = "NOAA";

/// Local timeout for every NOAA request.
const NOAA_TIMEOUT: Duration = Duration::from_secs(12);

/// Client for the NOAA metadata and data getter APIs.
#[derive(Debug, Clone)]
pub struct NoaaClient {
    client: reqwest::Client,
    metadata_url: String,
    data_url: String,
    application: String,
}

/// Prediction sampling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Hourly,
    HighLow,
}

impl Interval {
    fn as_param(self) -> &'static str {
        match self {
            Interval::Hourly => "h",
            Interval::HighLow => "hilo",
        }
    }
}

/// A station as described by the metadata API, with loosely-typed fields
/// already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub id: String,
    pub name: Option<String>,
    pub state: Option<String>,
    pub coordinate: Option<Coordinate>,
    pub status: Option<String>,
}

impl StationRecord {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("active"))
    }
}

/// A prediction row; `v` is kept as text until the caller parses it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub t: String,
    pub v: Option<f64>,
    pub kind: Option<String>,
}

// --- NOAA JSON response types ---

#[derive(Debug, Deserialize)]
struct StationListResponse {
    #[serde(default)]
    stations: Option<Vec<RawStation>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StationDetailField {
    Many(Vec<RawStation>),
    One(RawStation),
}

#[derive(Debug, Deserialize)]
struct StationDetailResponse {
    stations: Option<StationDetailField>,
}

#[derive(Debug, Deserialize)]
struct RawStation {
    #[serde(default)]
    id: serde_json::Value,
    name: Option<String>,
    state: Option<String>,
    #[serde(default)]
    lat: serde_json::Value,
    #[serde(default)]
    lng: serde_json::Value,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictionsResponse {
    predictions: Option<Vec<RawPrediction>>,
    error: Option<DataGetterError>,
}

#[derive(Debug, Deserialize)]
struct DataGetterError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    t: Option<String>,
    #[serde(default)]
    v: serde_json::Value,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Numbers arrive either as JSON numbers or as numeric strings.
fn value_as_f64(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RawStation {
    fn into_record(self) -> Option<StationRecord> {
        let id = value_as_string(&self.id)?;
        let coordinate = match (value_as_f64(&self.lat), value_as_f64(&self.lng)) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        };
        Some(StationRecord {
            id,
            name: self.name.filter(|n| !n.is_empty()),
            state: self.state,
            coordinate,
            status: self.status,
        })
    }
}

impl NoaaClient {
    pub fn new(metadata_url: &str, data_url: &str, application: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(NOAA_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            metadata_url: metadata_url.trim_end_matches('/').to_string(),
            data_url: data_url.to_string(),
            application: application.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))
    }

    /// Tide-prediction stations inside a box of ±`delta` degrees around `center`.
    pub async fn stations_in_bbox(
        &self,
        center: Coordinate,
        delta: f64,
    ) -> Result<Vec<StationRecord>, UpstreamError> {
        let bbox = format!(
            "{},{},{},{}",
            center.lon - delta,
            center.lat - delta,
            center.lon + delta,
            center.lat + delta
        );
        let url = format!("{}/stations.json", self.metadata_url);
        let body: StationListResponse = self
            .get_json(
                &url,
                &[("type", "tidepredictions".to_string()), ("bbox", bbox)],
            )
            .await?;

        Ok(body
            .stations
            .unwrap_or_default()
            .into_iter()
            .filter_map(RawStation::into_record)
            .collect())
    }

    /// Metadata for one station. The API answers with either an object or a
    /// one-element list under `stations`.
    pub async fn station_detail(&self, station_id: &str) -> Result<StationRecord, UpstreamError> {
        let url = format!("{}/stations/{}.json", self.metadata_url, station_id);
        let body: StationDetailResponse = self
            .get_json(&url, &[("type", "tidepredictions".to_string())])
            .await?;

        let raw = match body.stations {
            Some(StationDetailField::One(s)) => Some(s),
            Some(StationDetailField::Many(list)) => list.into_iter().next(),
            None => None,
        };

        let mut record = raw
            .and_then(RawStation::into_record)
            .unwrap_or(StationRecord {
                id: station_id.to_string(),
                name: None,
                state: None,
                coordinate: None,
                status: None,
            });
        // The detail endpoint is authoritative for the id we asked about.
        record.id = station_id.to_string();
        Ok(record)
    }

    /// Predictions (MLLW, GMT, feet) for `range_hours` from now.
    ///
    /// An in-band `error` object (e.g. a station without predictions) is a
    /// successful answer with no rows.
    pub async fn predictions(
        &self,
        station_id: &str,
        interval: Interval,
        range_hours: u32,
    ) -> Result<Vec<PredictionRecord>, UpstreamError> {
        let query = [
            ("product", "predictions".to_string()),
            ("application", self.application.clone()),
            ("station", station_id.to_string()),
            ("datum", "MLLW".to_string()),
            ("time_zone", "gmt".to_string()),
            ("units", "english".to_string()),
            ("interval", interval.as_param().to_string()),
            ("range", range_hours.to_string()),
            ("format", "json".to_string()),
        ];
        let body: PredictionsResponse = self.get_json(&self.data_url, &query).await?;

        if let Some(err) = body.error {
            tracing::warn!(
                "NOAA data getter error for station {} ({}): {}",
                station_id,
                interval.as_param(),
                err.message.as_deref().unwrap_or("no message")
            );
            return Ok(Vec::new());
        }

        Ok(body
            .predictions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| {
                Some(PredictionRecord {
                    t: p.t?,
                    v: value_as_f64(&p.v),
                    kind: p.kind,
                })
            })
            .collect())
    }
}
