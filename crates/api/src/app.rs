use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    import_rate_limit, metrics_handler, metrics_middleware, security_headers_middleware, trace_id,
    RateLimiterState,
};
use crate::routes::{
    activity_logs, analytics, blacklist, complaints, contracts, health, humanitarian_orgs,
    humanitarian_renewals, imports, notifications, parking_services, providers, reports,
};
use crate::services::{EmailService, ImportRunner, NotificationDispatcher, ProviderCache};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub rate_limiter: Arc<RateLimiterState>,
    pub provider_cache: ProviderCache,
    pub notifier: NotificationDispatcher,
    pub importer: ImportRunner,
}

impl AppState {
    /// Builds the state, failing when the JWT key material is unusable.
    pub fn new(config: Config, pool: PgPool) -> Result<Self, JwtError> {
        let jwt = config.jwt.build()?;
        let email = EmailService::new(config.email.clone());
        Ok(Self {
            jwt: Arc::new(jwt),
            rate_limiter: Arc::new(RateLimiterState::new(
                config.security.import_rate_limit_per_minute,
            )),
            provider_cache: ProviderCache::new(&config.cache),
            notifier: NotificationDispatcher::new(pool.clone(), Arc::new(email)),
            importer: ImportRunner::new(pool.clone(), &config.import),
            config: Arc::new(config),
            pool,
        })
    }
}

/// Creates the application router from config and a pool.
pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    Ok(build_router(AppState::new(config, pool)?))
}

/// Mounts every API router plus the health and metrics endpoints.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Import routes carry the per-user limiter; it authenticates before the handler.
    let import_routes = Router::new()
        .merge(imports::router())
        .merge(parking_services::import_router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            import_rate_limit,
        ));

    let api_routes = Router::new()
        .nest("/api/contracts", contracts::router())
        .nest("/api/renewals", contracts::renewals_router())
        .nest("/api/humanitarian-renewals", humanitarian_renewals::router())
        .nest("/api/complaints", complaints::router())
        .nest("/api/providers", providers::router())
        .nest("/api/humanitarian-orgs", humanitarian_orgs::router())
        .nest("/api/parking-services", parking_services::router())
        .nest("/api/analytics", analytics::router())
        .nest("/api/reports/scheduled", reports::router())
        .nest("/api/notifications", notifications::router())
        .nest("/api/blacklist", blacklist::router())
        .nest("/api/activity-logs", activity_logs::router())
        .merge(import_routes);

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
