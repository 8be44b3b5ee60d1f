pub mod advisor;
pub mod config;
pub mod db;
pub mod domains;
pub mod error;
pub mod handlers;
pub mod models;
pub mod request;
pub mod shorts;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use advisor::Advisor;
use config::AppConfig;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub db: sqlx::SqlitePool,
    /// Immutable after startup; holds the alias and writable-host tables.
    pub config: AppConfig,
    pub advisor: Advisor,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let advisor = Advisor::from_config(&config);
        Self { db, config, advisor }
    }
}

// ── Router ─────────────────────────────────────────────────────────────────

pub const CORS_ALLOW_METHODS: &str = "GET, POST, QUERY, OPTIONS";

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::redirect::root)
                .post(handlers::links::set_link)
                .options(handlers::links::preflight)
                // QUERY has no MethodFilter, so it arrives through the fallback.
                .fallback(handlers::suggest::query),
        )
        .route("/_favicon.png", get(handlers::redirect::favicon))
        .route("/_help", get(handlers::links::help))
        .route("/_list", get(handlers::links::list))
        // Short-link redirect — the underscore routes above take priority
        .route("/:short", get(handlers::redirect::short))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
}
