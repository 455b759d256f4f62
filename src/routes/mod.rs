pub mod account;
pub mod alerts;
pub mod analytics;
pub mod dashboard;
pub mod health;
pub mod parcels;
mod rate_limit;
pub mod sensors;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use rate_limit::{replenish_period, ClientIpExtractor};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;

struct ApiKeySecurity;

impl Modify for ApiKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        sensors::ingest_reading,
        sensors::sensor_history,
        sensors::update_sensor,
        sensors::delete_sensor,
        parcels::list_parcels,
        parcels::create_parcel,
        parcels::update_parcel,
        parcels::delete_parcel,
        parcels::list_parcel_sensors,
        parcels::create_parcel_sensor,
        alerts::list_active,
        alerts::list_history,
        alerts::acknowledge,
        alerts::resolve,
        dashboard::summary,
        dashboard::recent_readings,
        analytics::get_analytics,
        analytics::export_analytics,
        account::login,
        account::profile,
        account::regenerate_api_key,
        account::update_password,
    ),
    components(
        schemas(
            sensors::IngestRequest,
            sensors::IngestResponse,
            crate::services::sensors::ReadingView,
            crate::services::sensors::SensorView,
            crate::services::sensors::NewSensor,
            crate::services::sensors::SensorUpdate,
            crate::services::parcels::ParcelInput,
            crate::services::parcels::ParcelView,
            crate::services::alerts::AlertView,
            crate::services::dashboard::DashboardSummary,
            crate::services::dashboard::RecentReading,
            crate::services::analytics::AnalyticsReport,
            crate::services::accounts::Credentials,
            crate::services::accounts::PasswordChange,
            account::ApiKeyResponse,
            crate::auth::CurrentUser,
        )
    ),
    modifiers(&ApiKeySecurity),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sensors", description = "Reading ingestion, history and sensor management"),
        (name = "parcels", description = "Parcels and their sensors"),
        (name = "alerts", description = "Threshold alerts"),
        (name = "dashboard", description = "Summary counts and recent activity"),
        (name = "analytics", description = "Sensor comparison and export"),
        (name = "account", description = "Profile and credentials"),
    ),
    info(
        title = "Agrotech API",
        description = "Farm monitoring: parcels, sensors, readings and alerts",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
    } else {
        tracing::info!(
            read_rate = %format!("{}/s burst {}", config.rate_limit_read_per_second, config.rate_limit_read_burst),
            ingest_rate = %format!("{}/s burst {}", config.rate_limit_ingest_per_second, config.rate_limit_ingest_burst),
            export_concurrent = config.bulk_concurrent_limit,
            "Rate limiting configured"
        );
    }

    // Device traffic
    let ingest_routes_base = Router::new().route(
        "/sensors/{sensor_id}/data",
        post(sensors::ingest_reading).get(sensors::sensor_history),
    );

    // Dashboard and management traffic
    let read_routes_base = Router::new()
        .route(
            "/sensors/{sensor_id}",
            put(sensors::update_sensor).delete(sensors::delete_sensor),
        )
        .route(
            "/parcels",
            get(parcels::list_parcels).post(parcels::create_parcel),
        )
        .route(
            "/parcels/{parcel_id}",
            put(parcels::update_parcel).delete(parcels::delete_parcel),
        )
        .route(
            "/parcels/{parcel_id}/sensors",
            get(parcels::list_parcel_sensors).post(parcels::create_parcel_sensor),
        )
        .route("/alerts/active", get(alerts::list_active))
        .route("/alerts/history", get(alerts::list_history))
        .route("/alerts/{alert_id}/acknowledge", post(alerts::acknowledge))
        .route("/alerts/{alert_id}/resolve", post(alerts::resolve))
        .route("/dashboard", get(dashboard::summary))
        .route("/dashboard/recent-readings", get(dashboard::recent_readings))
        .route("/analytics", get(analytics::get_analytics))
        .route("/analytics/export", get(analytics::export_analytics))
        .route("/account", get(account::profile))
        .route("/account/login", post(account::login))
        .route("/account/api-key", post(account::regenerate_api_key))
        .route("/account/password", put(account::update_password));

    let api_routes = if config.disable_rate_limiting {
        Router::new()
            .merge(ingest_routes_base)
            .merge(read_routes_base)
    } else {
        let ingest_limiter = GovernorConfigBuilder::default()
            .key_extractor(ClientIpExtractor)
            .period(replenish_period(config.rate_limit_ingest_per_second))
            .burst_size(config.rate_limit_ingest_burst)
            .finish()
            .expect("Failed to create ingest rate limiter");

        let read_limiter = GovernorConfigBuilder::default()
            .key_extractor(ClientIpExtractor)
            .period(replenish_period(config.rate_limit_read_per_second))
            .burst_size(config.rate_limit_read_burst)
            .finish()
            .expect("Failed to create read rate limiter");

        Router::new()
            .merge(ingest_routes_base.layer(GovernorLayer {
                config: Arc::new(ingest_limiter),
            }))
            .merge(read_routes_base.layer(GovernorLayer {
                config: Arc::new(read_limiter),
            }))
    }
    .layer(RequestBodyLimitLayer::new(1024 * 1024));

    let health_routes = Router::new().route("/healthz", get(health::healthz));

    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
