pub mod v1;

use axum::Router;
use cinerank_model::routes::v1 as paths;

use crate::AppState;

/// Create the main API router with all versions
pub fn create_api_router() -> Router<AppState> {
    Router::new().nest(paths::ROOT, v1::create_v1_router())
}
