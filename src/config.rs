/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Open-Meteo marine endpoint (full URL, queried with GET).
    pub marine_api_url: String,
    /// NOAA metadata API base, without the trailing `/stations.json`.
    pub noaa_metadata_url: String,
    /// NOAA data getter endpoint (full URL).
    pub noaa_data_url: String,
    /// Sent as the `application` parameter on every NOAA data request.
    pub noaa_application: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            marine_api_url: std::env::var("MARINE_API_URL")
                .unwrap_or_else(|_| "https://marine-api.open-meteo.com/v1/marine".to_string()),
            noaa_metadata_url: std::env::var("NOAA_METADATA_URL").unwrap_or_else(|_| {
                "https://api.tidesandcurrents.noaa.gov/mdapi/prod/webapi".to_string()
            }),
            noaa_data_url: std::env::var("NOAA_DATA_URL").unwrap_or_else(|_| {
                "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter".to_string()
            }),
            noaa_application: std::env::var("NOAA_APPLICATION")
                .unwrap_or_else(|_| "LagoonLink".to_string()),
        }
    }
}
