//! Request and response payloads exchanged with the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{ComparisonDecision, RatingCategory};
use crate::ids::RankedItemId;
use crate::ranking::{MetadataSnapshot, Placement, RankedItem};

/// Success envelope. Failures use the server's `{error: {message, status}}`
/// body instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

// ===== Requests =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRatingRequest {
    pub tmdb_id: i64,
    pub category: RatingCategory,
    #[serde(default)]
    pub movie: MetadataSnapshot,
    /// Required once the user has ten or more ratings and has completed
    /// the initial ranking.
    #[serde(default)]
    pub placement: Option<Placement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPlacementRequest {
    pub tmdb_id: i64,
    pub category: RatingCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementDecisionRequest {
    pub decision: ComparisonDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialRankingRequest {
    /// Worst to best
    pub ordered_ids: Vec<RankedItemId>,
}

// ===== Responses =====

/// A ranked item as rendered by clients. Positions travel as decimal
/// strings so no precision is lost in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItemView {
    pub id: RankedItemId,
    pub tmdb_id: i64,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub category: RatingCategory,
    pub rating: f64,
    pub position: String,
}

impl From<&RankedItem> for RankedItemView {
    fn from(item: &RankedItem) -> Self {
        Self {
            id: item.id,
            tmdb_id: item.external_ref,
            title: item.cached_title.clone(),
            poster_path: item.cached_poster_path.clone(),
            release_date: item.cached_release_date.clone(),
            category: item.category,
            rating: item.numeric_score,
            position: item.position.normalized().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingResponse {
    pub rating: RankedItemView,
    /// True when the user's list had to be re-spaced to make room.
    pub rebalanced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlacementStepResponse {
    Compare {
        session_id: Uuid,
        round: u32,
        candidate: RankedItemView,
    },
    Resolved {
        session_id: Uuid,
        placement: Placement,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedRankingsResponse {
    pub ratings: Vec<RankedItemView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialRankingResponse {
    /// The full list after the bootstrap, worst to best.
    pub ratings: Vec<RankedItemView>,
    /// Ratings missing from the submitted order, placed after it.
    pub appended_ids: Vec<RankedItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingStateResponse {
    pub total_ratings: usize,
    pub needs_initial_ranking: bool,
    pub has_completed_initial_ranking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_ratings: Option<Vec<RankedItemView>>,
}
