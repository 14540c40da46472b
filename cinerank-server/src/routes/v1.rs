use axum::{
    Router,
    routing::{delete, get, post},
};
use cinerank_model::routes::{utils::relative, v1};

use crate::{
    AppState,
    handlers::{rankings, ratings},
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            relative(v1::movies::RATE),
            post(ratings::rate_movie_handler),
        )
        .route(
            relative(v1::rankings::PLACEMENT),
            post(rankings::start_placement_handler),
        )
        .route(
            relative(v1::rankings::PLACEMENT_DECISION),
            post(rankings::placement_decision_handler),
        )
        .route(
            relative(v1::rankings::PLACEMENT_SESSION),
            delete(rankings::cancel_placement_handler),
        )
        .route(
            relative(v1::rankings::INITIAL),
            post(rankings::initial_ranking_handler),
        )
        .route(
            relative(v1::rankings::ORDERED),
            get(rankings::ordered_rankings_handler),
        )
        .route(
            relative(v1::rankings::STATE),
            get(rankings::ranking_state_handler),
        )
}
