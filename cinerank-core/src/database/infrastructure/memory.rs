//! In-process adapter used for local development and tests.
//!
//! Batch writes validate every row before touching any of them, so a failed
//! batch leaves the stored state exactly as it was.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use cinerank_model::{RankedItem, RankedItemId, UserRankingState};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::ports::rankings::{NewRankedItem, RankingRepository};
use crate::error::{RankingError, Result};
use crate::ranking::rebalance::PositionUpdate;

#[derive(Debug, Default)]
struct MemoryState {
    items: HashMap<Uuid, Vec<RankedItem>>,
    states: HashMap<Uuid, UserRankingState>,
}

impl MemoryState {
    fn validate_updates(
        &self,
        owner_id: Uuid,
        updates: &[PositionUpdate],
    ) -> Result<()> {
        let items = self.items.get(&owner_id);
        for update in updates {
            let owned = items
                .map(|items| items.iter().any(|item| item.id == update.id))
                .unwrap_or(false);
            if !owned {
                return Err(RankingError::Database(format!(
                    "Failed to update position for rating {}: row not found",
                    update.id
                )));
            }
        }
        Ok(())
    }

    fn apply_updates(&mut self, owner_id: Uuid, updates: &[PositionUpdate]) {
        let now = Utc::now();
        if let Some(items) = self.items.get_mut(&owner_id) {
            for update in updates {
                if let Some(item) = items.iter_mut().find(|item| item.id == update.id) {
                    item.position = update.position.clone();
                    item.numeric_score = update.numeric_score;
                    item.updated_at = now;
                }
            }
        }
    }
}

/// Process-local repository used when no database is configured, and in tests.
#[derive(Debug, Default)]
pub struct InMemoryRankingRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryRankingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankingRepository for InMemoryRankingRepository {
    async fn ranking_state(&self, owner_id: Uuid) -> Result<UserRankingState> {
        let state = self.state.read().await;
        Ok(state
            .states
            .get(&owner_id)
            .cloned()
            .unwrap_or_else(|| UserRankingState::new(owner_id)))
    }

    async fn count_items(&self, owner_id: Uuid) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state.items.get(&owner_id).map(Vec::len).unwrap_or(0))
    }

    async fn list_ordered(&self, owner_id: Uuid) -> Result<Vec<RankedItem>> {
        let state = self.state.read().await;
        let mut items = state.items.get(&owner_id).cloned().unwrap_or_default();
        items.sort_by(RankedItem::rank_cmp);
        Ok(items)
    }

    async fn find_item(
        &self,
        owner_id: Uuid,
        id: RankedItemId,
    ) -> Result<Option<RankedItem>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .get(&owner_id)
            .and_then(|items| items.iter().find(|item| item.id == id))
            .cloned())
    }

    async fn find_by_external_ref(
        &self,
        owner_id: Uuid,
        external_ref: i64,
    ) -> Result<Option<RankedItem>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .get(&owner_id)
            .and_then(|items| items.iter().find(|item| item.external_ref == external_ref))
            .cloned())
    }

    async fn upsert_item(&self, new_item: &NewRankedItem) -> Result<RankedItem> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let items = state.items.entry(new_item.owner_id).or_default();

        if let Some(existing) = items
            .iter_mut()
            .find(|item| item.external_ref == new_item.external_ref)
        {
            existing.category = new_item.category;
            existing.position = new_item.position.clone();
            existing.numeric_score = new_item.numeric_score;
            existing.cached_title = new_item.snapshot.title.clone();
            existing.cached_poster_path = new_item.snapshot.poster_path.clone();
            existing.cached_release_date = new_item.snapshot.release_date.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let item = RankedItem {
            id: RankedItemId::new(),
            owner_id: new_item.owner_id,
            external_ref: new_item.external_ref,
            category: new_item.category,
            numeric_score: new_item.numeric_score,
            position: new_item.position.clone(),
            cached_title: new_item.snapshot.title.clone(),
            cached_poster_path: new_item.snapshot.poster_path.clone(),
            cached_release_date: new_item.snapshot.release_date.clone(),
            created_at: now,
            updated_at: now,
        };
        items.push(item.clone());
        Ok(item)
    }

    async fn apply_positions(
        &self,
        owner_id: Uuid,
        updates: &[PositionUpdate],
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.validate_updates(owner_id, updates)?;
        state.apply_updates(owner_id, updates);
        Ok(())
    }

    async fn complete_initial_ranking(
        &self,
        owner_id: Uuid,
        updates: &[PositionUpdate],
    ) -> Result<UserRankingState> {
        let mut state = self.state.write().await;
        state.validate_updates(owner_id, updates)?;
        state.apply_updates(owner_id, updates);

        let ranking_state = state
            .states
            .entry(owner_id)
            .or_insert_with(|| UserRankingState::new(owner_id));
        if !ranking_state.has_completed_initial_ranking {
            ranking_state.has_completed_initial_ranking = true;
            ranking_state.completed_at = Some(Utc::now());
        }
        Ok(ranking_state.clone())
    }
}
