use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use cinerank_core::ranking::PlacementProgress;
use cinerank_model::{
    ApiResponse, RankedItem,
    api::{
        InitialRankingRequest, InitialRankingResponse, OrderedRankingsResponse,
        PlacementDecisionRequest, PlacementStepResponse, RankedItemView,
        RankingStateResponse, StartPlacementRequest,
    },
};
use uuid::Uuid;

use crate::{errors::AppResult, extract::AuthenticatedOwner, infra::app_state::AppState};

fn views(items: &[RankedItem]) -> Vec<RankedItemView> {
    items.iter().map(RankedItemView::from).collect()
}

fn step_response(progress: PlacementProgress) -> PlacementStepResponse {
    match progress {
        PlacementProgress::Compare {
            session_id,
            round,
            candidate,
        } => PlacementStepResponse::Compare {
            session_id,
            round,
            candidate: RankedItemView::from(&candidate),
        },
        PlacementProgress::Resolved {
            session_id,
            placement,
        } => PlacementStepResponse::Resolved {
            session_id,
            placement,
        },
    }
}

/// Open a comparison session for a movie the user is about to rate.
pub async fn start_placement_handler(
    State(state): State<AppState>,
    AuthenticatedOwner(owner_id): AuthenticatedOwner,
    payload: Result<Json<StartPlacementRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PlacementStepResponse>>> {
    let Json(request) = payload?;
    let progress = state
        .ranking()
        .start_placement(owner_id, request.tmdb_id, request.category)
        .await?;
    Ok(Json(ApiResponse::success(step_response(progress))))
}

pub async fn placement_decision_handler(
    State(state): State<AppState>,
    AuthenticatedOwner(owner_id): AuthenticatedOwner,
    Path(session_id): Path<Uuid>,
    payload: Result<Json<PlacementDecisionRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PlacementStepResponse>>> {
    let Json(request) = payload?;
    let progress =
        state
            .ranking()
            .decide_placement(owner_id, session_id, request.decision)?;
    Ok(Json(ApiResponse::success(step_response(progress))))
}

pub async fn cancel_placement_handler(
    State(state): State<AppState>,
    AuthenticatedOwner(owner_id): AuthenticatedOwner,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.ranking().cancel_placement(owner_id, session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// One-time ordering of the user's first ratings, worst to best.
pub async fn initial_ranking_handler(
    State(state): State<AppState>,
    AuthenticatedOwner(owner_id): AuthenticatedOwner,
    payload: Result<Json<InitialRankingRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<InitialRankingResponse>>> {
    let Json(request) = payload?;
    let outcome = state
        .ranking()
        .complete_initial_ranking(owner_id, &request.ordered_ids)
        .await?;

    Ok(Json(ApiResponse::success(InitialRankingResponse {
        ratings: views(&outcome.items),
        appended_ids: outcome.appended,
    })))
}

pub async fn ordered_rankings_handler(
    State(state): State<AppState>,
    AuthenticatedOwner(owner_id): AuthenticatedOwner,
) -> AppResult<Json<ApiResponse<OrderedRankingsResponse>>> {
    let items = state.ranking().ordered_items(owner_id).await?;
    Ok(Json(ApiResponse::success(OrderedRankingsResponse {
        ratings: views(&items),
    })))
}

pub async fn ranking_state_handler(
    State(state): State<AppState>,
    AuthenticatedOwner(owner_id): AuthenticatedOwner,
) -> AppResult<Json<ApiResponse<RankingStateResponse>>> {
    let view = state.ranking().ranking_state(owner_id).await?;
    Ok(Json(ApiResponse::success(RankingStateResponse {
        total_ratings: view.total,
        needs_initial_ranking: view.needs_initial_ranking,
        has_completed_initial_ranking: view.has_completed_initial_ranking,
        initial_ratings: view.initial_items.as_deref().map(views),
    })))
}
