use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::category::RatingCategory;
use crate::ids::RankedItemId;

/// One user's rating of one catalog movie, placed in that user's total order.
///
/// `position` lies in the open interval (0, 1); ascending position runs from
/// the user's least favourite movie to their favourite.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RankedItem {
    pub id: RankedItemId,
    pub owner_id: Uuid,
    /// TMDB movie id
    pub external_ref: i64,
    pub category: RatingCategory,
    /// Display score in `[0, 10]`, derived from `position`
    pub numeric_score: f64,
    pub position: BigDecimal,
    pub cached_title: Option<String>,
    pub cached_poster_path: Option<String>,
    pub cached_release_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RankedItem {
    /// Total order used everywhere a user's list is sorted: position, then
    /// creation time, then id so equal timestamps stay deterministic.
    pub fn rank_cmp(&self, other: &RankedItem) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Per-user bootstrap flag. Created lazily, flips to `true` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserRankingState {
    pub owner_id: Uuid,
    pub has_completed_initial_ranking: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl UserRankingState {
    pub fn new(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            has_completed_initial_ranking: false,
            completed_at: None,
        }
    }
}

/// Neighbor pair produced by the comparison search. `None` on either side
/// means the list boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    #[cfg_attr(feature = "serde", serde(default))]
    pub before_id: Option<RankedItemId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub after_id: Option<RankedItemId>,
}

impl Placement {
    pub fn is_unbounded(&self) -> bool {
        self.before_id.is_none() && self.after_id.is_none()
    }
}

/// Denormalized catalog fields stored alongside a rating so lists render
/// without a live lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetadataSnapshot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub poster_path: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub release_date: Option<String>,
}

impl MetadataSnapshot {
    pub fn has_title(&self) -> bool {
        self.title
            .as_deref()
            .is_some_and(|title| !title.trim().is_empty())
    }

    /// Fill fields missing here from a catalog lookup, keeping what the
    /// caller supplied.
    pub fn merge_missing(mut self, movie: &MovieMetadata) -> Self {
        if !self.has_title() {
            self.title = Some(movie.title.clone());
        }
        if self.poster_path.is_none() {
            self.poster_path = movie.poster_path.clone();
        }
        if self.release_date.is_none() {
            self.release_date = movie.release_date.clone();
        }
        self
    }
}

/// Movie details returned by the catalog provider.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MovieMetadata {
    pub id: i64,
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub overview: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub poster_path: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub release_date: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub vote_average: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub vote_count: u64,
}
