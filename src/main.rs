// LagoonLink API v0.1
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod identity;
mod routes;
mod services;

use config::AppConfig;
use db::PgDiveStore;
use routes::AppState;
use services::cache::{Clock, SystemClock};
use services::marine::MarineConditionsFetcher;
use services::noaa::NoaaClient;
use services::tide_station::TideStationResolver;
use services::tides::TidePredictionFetcher;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// LagoonLink API OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LagoonLink API",
        version = "0.1.0",
        description = "Dive log API. Ranks nearby dive spots with live wind, wave and \
            sea-temperature conditions from Open-Meteo, and serves NOAA tide predictions \
            for the nearest station with caching and stale fallback when NOAA is down.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Dives", description = "Dive log listings"),
        (name = "Spots", description = "Nearby dive spots with live conditions"),
        (name = "Tides", description = "NOAA tide predictions"),
    ),
    paths(
        routes::health::health_check,
        routes::dives::list_public_dives,
        routes::dives::list_my_dives,
        routes::spots::get_nearby_spots,
        routes::tides::get_tides,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::health::HealthStatus,
            routes::dives::PublicDiveItem,
            routes::dives::MyDiveItem,
            services::nearby::NearbySpot,
            services::marine::MarineSnapshot,
            routes::tides::TideResponse,
            routes::tides::StationResponse,
            services::tide_station::TideStation,
            services::tides::TidePoint,
            services::tides::TideEvent,
            services::tides::TideKind,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lagoonlink_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Upstream clients share one wall clock for cache freshness
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let noaa = NoaaClient::new(
        &config.noaa_metadata_url,
        &config.noaa_data_url,
        &config.noaa_application,
    );

    let app_state = AppState {
        dives: Arc::new(PgDiveStore::new(pool)),
        marine: Arc::new(MarineConditionsFetcher::new(
            &config.marine_api_url,
            clock.clone(),
        )),
        stations: Arc::new(TideStationResolver::new(noaa.clone())),
        tides: Arc::new(TidePredictionFetcher::new(noaa, clock)),
    };

    // CORS: read-only API, GET only
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/public_dives", get(routes::dives::list_public_dives))
        .route("/api/my_dives", get(routes::dives::list_my_dives))
        .route("/api/nearby_spots", get(routes::spots::get_nearby_spots))
        .route("/api/tides", get(routes::tides::get_tides))
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
