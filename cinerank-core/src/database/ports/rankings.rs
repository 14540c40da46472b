use async_trait::async_trait;
use bigdecimal::BigDecimal;
use cinerank_model::{
    MetadataSnapshot, RankedItem, RankedItemId, RatingCategory, UserRankingState,
};
use uuid::Uuid;

use crate::error::Result;
use crate::ranking::rebalance::PositionUpdate;

/// Values written when a user rates (or re-rates) a movie.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRankedItem {
    pub owner_id: Uuid,
    pub external_ref: i64,
    pub category: RatingCategory,
    pub position: BigDecimal,
    pub numeric_score: f64,
    pub snapshot: MetadataSnapshot,
}

/// Storage for ranked items and per-user bootstrap state. Every query is
/// scoped to one owner.
#[async_trait]
pub trait RankingRepository: Send + Sync {
    /// Ranking state for `owner_id`; users without a stored row get the
    /// default (initial ranking not completed).
    async fn ranking_state(&self, owner_id: Uuid) -> Result<UserRankingState>;

    async fn count_items(&self, owner_id: Uuid) -> Result<usize>;

    /// All of the user's items, worst to best (position, then creation time).
    async fn list_ordered(&self, owner_id: Uuid) -> Result<Vec<RankedItem>>;

    /// Lookup scoped to the owner: another user's id yields `None`.
    async fn find_item(
        &self,
        owner_id: Uuid,
        id: RankedItemId,
    ) -> Result<Option<RankedItem>>;

    async fn find_by_external_ref(
        &self,
        owner_id: Uuid,
        external_ref: i64,
    ) -> Result<Option<RankedItem>>;

    /// Insert, or update in place when `(owner_id, external_ref)` exists.
    /// Updates keep the item's id and creation time.
    async fn upsert_item(&self, item: &NewRankedItem) -> Result<RankedItem>;

    /// Write every update or none of them. An id that does not belong to
    /// `owner_id` fails the whole batch.
    async fn apply_positions(
        &self,
        owner_id: Uuid,
        updates: &[PositionUpdate],
    ) -> Result<()>;

    /// Apply the bootstrap positions and flip the completion flag in one
    /// atomic unit.
    async fn complete_initial_ranking(
        &self,
        owner_id: Uuid,
        updates: &[PositionUpdate],
    ) -> Result<UserRankingState>;
}
