use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use cinerank_core::ranking::SubmitRating;
use cinerank_model::{
    ApiResponse,
    api::{RankedItemView, RatingResponse, SubmitRatingRequest},
};

use crate::{errors::AppResult, extract::AuthenticatedOwner, infra::app_state::AppState};

/// Rate a movie. Below the ranking threshold the category decides the
/// position; after the initial ranking a placement is required.
pub async fn rate_movie_handler(
    State(state): State<AppState>,
    AuthenticatedOwner(owner_id): AuthenticatedOwner,
    payload: Result<Json<SubmitRatingRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<RatingResponse>>> {
    let Json(request) = payload?;

    let outcome = state
        .ranking()
        .submit_rating(SubmitRating {
            owner_id,
            external_ref: request.tmdb_id,
            category: request.category,
            snapshot: request.movie,
            placement: request.placement,
        })
        .await?;

    Ok(Json(ApiResponse::success(RatingResponse {
        rating: RankedItemView::from(&outcome.item),
        rebalanced: outcome.rebalanced(),
    })))
}
