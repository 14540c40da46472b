//! # Cinerank Server
//!
//! HTTP API over the Cinerank ranking engine. Users rate movies into three
//! coarse categories; once they have ten ratings they order them by hand, and
//! from then on every new movie is placed through pairwise comparisons.
//!
//! The router is built here so integration tests can drive it without a
//! listening socket.

pub mod errors;
pub mod extract;
pub mod handlers;
pub mod infra;
pub mod routes;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method},
    routing::get,
};
use cinerank_model::routes::HEALTH;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

pub use infra::app_state::AppState;

use crate::{extract::USER_ID_HEADER, infra::config::Config};

/// Build the full application router.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = cors_layer(state.config());

    Router::new()
        .route(HEALTH, get(handlers::health::health_handler))
        .merge(routes::create_api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
        ]))
        .max_age(Duration::from_secs(3600))
}

/// Drop idle placement sessions once a minute until the runtime shuts down.
pub fn spawn_session_sweeper(state: &AppState) -> tokio::task::JoinHandle<()> {
    let ranking = state.ranking.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let purged = ranking.sessions().purge_expired();
            if purged > 0 {
                debug!(purged, "expired placement sessions removed");
            }
        }
    })
}
