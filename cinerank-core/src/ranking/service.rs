//! The ranking service: every operation that reads or changes a user's list
//! goes through here.
//!
//! Writes for one user are serialized with a per-user async mutex so two
//! concurrent ratings never bisect the same neighbor pair. Different users
//! never contend.

use std::fmt;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use cinerank_model::{
    ComparisonDecision, MetadataSnapshot, Placement, RankedItem, RankedItemId,
    RatingCategory, UserRankingState,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::allocator::{AllocationError, PositionAllocator};
use super::bootstrap::plan_initial_ranking;
use super::locks::OwnerLocks;
use super::placement::{PlacementStep, neighbors};
use super::rebalance::plan_rebalance;
use super::score::score_from_position;
use super::sessions::{PlacementSession, PlacementSessions};
use crate::config::RankingConfig;
use crate::database::ports::rankings::{NewRankedItem, RankingRepository};
use crate::error::{RankingError, Result};
use crate::providers::{MovieMetadataProvider, ProviderError};

/// A rating as submitted by a user.
#[derive(Debug, Clone)]
pub struct SubmitRating {
    pub owner_id: Uuid,
    /// TMDB movie id
    pub external_ref: i64,
    pub category: RatingCategory,
    pub snapshot: MetadataSnapshot,
    /// Neighbors chosen through the placement flow. Required once the user
    /// has completed the initial ranking.
    pub placement: Option<Placement>,
}

/// How the stored position was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionResolution {
    CategoryDefault,
    Allocated,
    /// The list was re-spaced before a position could be allocated.
    Rebalanced,
    /// Even after re-spacing there was no room; the fallback offset was used.
    Fallback,
}

/// The stored item and how its position was chosen.
#[derive(Debug, Clone)]
pub struct RatingOutcome {
    pub item: RankedItem,
    pub resolution: PositionResolution,
}

impl RatingOutcome {
    /// Whether the list was re-spaced while storing this rating.
    pub fn rebalanced(&self) -> bool {
        matches!(
            self.resolution,
            PositionResolution::Rebalanced | PositionResolution::Fallback
        )
    }
}

/// Next step of an interactive placement.
#[derive(Debug, Clone)]
pub enum PlacementProgress {
    Compare {
        session_id: Uuid,
        round: u32,
        candidate: RankedItem,
    },
    Resolved {
        session_id: Uuid,
        placement: Placement,
    },
}

/// Result of the one-time manual ordering.
#[derive(Debug, Clone)]
pub struct InitialRankingOutcome {
    pub state: UserRankingState,
    /// The user's list after the bootstrap, worst to best.
    pub items: Vec<RankedItem>,
    /// Ratings the caller left out, appended after the supplied order.
    pub appended: Vec<RankedItemId>,
}

/// A user's progress toward, or past, the initial ranking.
#[derive(Debug, Clone)]
pub struct RankingStateView {
    pub total: usize,
    pub needs_initial_ranking: bool,
    pub has_completed_initial_ranking: bool,
    /// The first ratings by creation time, present only while the initial
    /// ranking is pending.
    pub initial_items: Option<Vec<RankedItem>>,
}

/// Entry point for rating, placing and ordering a user's movies.
pub struct RankingService {
    repository: Arc<dyn RankingRepository>,
    metadata: Option<Arc<dyn MovieMetadataProvider>>,
    config: RankingConfig,
    allocator: PositionAllocator,
    sessions: PlacementSessions,
    locks: OwnerLocks,
}

impl fmt::Debug for RankingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankingService")
            .field("config", &self.config)
            .field("metadata", &self.metadata.is_some())
            .field("open_sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl RankingService {
    /// Build a service over `repository`. Without a metadata provider snapshots
    /// are stored as submitted.
    pub fn new(
        repository: Arc<dyn RankingRepository>,
        metadata: Option<Arc<dyn MovieMetadataProvider>>,
        config: RankingConfig,
    ) -> Self {
        let allocator = PositionAllocator::from_config(&config);
        let sessions = PlacementSessions::new(config.placement_session_ttl);
        Self {
            repository,
            metadata,
            config,
            allocator,
            sessions,
            locks: OwnerLocks::new(),
        }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Open placement sessions, swept periodically by the server.
    pub fn sessions(&self) -> &PlacementSessions {
        &self.sessions
    }

    fn ensure_can_rate(&self, total: usize, state: &UserRankingState) -> Result<()> {
        if total >= self.config.initial_ranking_threshold
            && !state.has_completed_initial_ranking
        {
            return Err(RankingError::RankingRequired { total });
        }
        Ok(())
    }

    fn validate_external_ref(external_ref: i64) -> Result<()> {
        if external_ref <= 0 {
            return Err(RankingError::Validation(format!(
                "Invalid tmdbId: {external_ref}"
            )));
        }
        Ok(())
    }

    /// Store a rating, placing it in the user's order.
    ///
    /// Below the ranking threshold the category default is used. Above it the
    /// caller must supply the neighbors found through the placement flow.
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id, tmdb_id = request.external_ref))]
    pub async fn submit_rating(&self, request: SubmitRating) -> Result<RatingOutcome> {
        Self::validate_external_ref(request.external_ref)?;
        let owner_id = request.owner_id;

        let _guard = self.locks.acquire(owner_id).await;

        let state = self.repository.ranking_state(owner_id).await?;
        let total = self.repository.count_items(owner_id).await?;
        self.ensure_can_rate(total, &state)?;

        let snapshot = self
            .enrich_snapshot(request.external_ref, request.snapshot)
            .await;

        let (position, resolution) = if total < self.config.initial_ranking_threshold {
            (
                self.default_position(request.category),
                PositionResolution::CategoryDefault,
            )
        } else {
            let placement = request.placement.ok_or_else(|| {
                RankingError::validation("Placement details are required")
            })?;
            let existing = self
                .repository
                .find_by_external_ref(owner_id, request.external_ref)
                .await?;
            let others = total - usize::from(existing.is_some());
            self.resolve_position(
                owner_id,
                request.category,
                existing.map(|item| item.id),
                others,
                placement,
            )
            .await?
        };

        let item = self
            .repository
            .upsert_item(&NewRankedItem {
                owner_id,
                external_ref: request.external_ref,
                category: request.category,
                numeric_score: score_from_position(&position),
                position,
                snapshot,
            })
            .await?;

        debug!(item_id = %item.id, position = %item.position, ?resolution, "rating stored");
        Ok(RatingOutcome { item, resolution })
    }

    fn default_position(&self, category: RatingCategory) -> BigDecimal {
        self.config
            .category_defaults
            .position_for(category)
            .round(self.config.position_scale)
    }

    /// `others` counts the user's items besides the one being rated. With no
    /// other items the category default applies; otherwise at least one
    /// neighbor must resolve to an existing item.
    async fn resolve_position(
        &self,
        owner_id: Uuid,
        category: RatingCategory,
        exclude: Option<RankedItemId>,
        others: usize,
        placement: Placement,
    ) -> Result<(BigDecimal, PositionResolution)> {
        if others == 0 {
            return Ok((
                self.default_position(category),
                PositionResolution::CategoryDefault,
            ));
        }

        let (low, high) = self.neighbor_positions(owner_id, exclude, placement).await?;
        if low.is_none() && high.is_none() {
            let message = if placement.is_unbounded() {
                "Placement details are required"
            } else {
                "Placement neighbors were not found"
            };
            return Err(RankingError::validation(message));
        }
        match self.allocator.allocate(low.as_ref(), high.as_ref()) {
            Ok(position) => return Ok((position, PositionResolution::Allocated)),
            Err(AllocationError::PositionExhausted { low, high }) => {
                info!(%low, %high, "no room between neighbors, rebalancing");
            }
        }

        self.rebalance_locked(owner_id).await?;

        let (low, high) = self.neighbor_positions(owner_id, exclude, placement).await?;
        match self.allocator.allocate(low.as_ref(), high.as_ref()) {
            Ok(position) => Ok((position, PositionResolution::Rebalanced)),
            Err(err) => {
                let position = self
                    .allocator
                    .fallback(low.as_ref(), &self.config.fallback_epsilon);
                warn!(error = %err, %position, "still no room after rebalance, using fallback offset");
                Ok((position, PositionResolution::Fallback))
            }
        }
    }

    /// Current positions of the chosen neighbors. A neighbor that no longer
    /// exists, belongs to someone else, or is the item being re-rated counts
    /// as the list boundary.
    async fn neighbor_positions(
        &self,
        owner_id: Uuid,
        exclude: Option<RankedItemId>,
        placement: Placement,
    ) -> Result<(Option<BigDecimal>, Option<BigDecimal>)> {
        let low = self
            .neighbor_position(owner_id, exclude, placement.before_id)
            .await?;
        let high = self
            .neighbor_position(owner_id, exclude, placement.after_id)
            .await?;
        Ok((low, high))
    }

    async fn neighbor_position(
        &self,
        owner_id: Uuid,
        exclude: Option<RankedItemId>,
        neighbor: Option<RankedItemId>,
    ) -> Result<Option<BigDecimal>> {
        let Some(id) = neighbor else {
            return Ok(None);
        };
        if exclude == Some(id) {
            debug!(neighbor_id = %id, "neighbor is the item being rated, using list boundary");
            return Ok(None);
        }
        match self.repository.find_item(owner_id, id).await? {
            Some(item) => Ok(Some(item.position)),
            None => {
                debug!(neighbor_id = %id, "neighbor not found, using list boundary");
                Ok(None)
            }
        }
    }

    /// Fill a snapshot's missing fields from the catalog. Lookup failures and
    /// timeouts are logged and the snapshot is kept as supplied.
    async fn enrich_snapshot(
        &self,
        external_ref: i64,
        snapshot: MetadataSnapshot,
    ) -> MetadataSnapshot {
        if snapshot.has_title() {
            return snapshot;
        }
        let Some(provider) = &self.metadata else {
            return snapshot;
        };

        let lookup = tokio::time::timeout(
            self.config.metadata_timeout,
            provider.get_movie(external_ref),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout));

        match lookup {
            Ok(movie) => snapshot.merge_missing(&movie),
            Err(err) => {
                warn!(tmdb_id = external_ref, error = %err, "metadata lookup failed, keeping snapshot");
                snapshot
            }
        }
    }

    /// Evenly re-space the user's whole list. Returns the number of items
    /// rewritten.
    pub async fn rebalance(&self, owner_id: Uuid) -> Result<usize> {
        let _guard = self.locks.acquire(owner_id).await;
        self.rebalance_locked(owner_id).await
    }

    async fn rebalance_locked(&self, owner_id: Uuid) -> Result<usize> {
        let items = self.repository.list_ordered(owner_id).await?;
        if items.is_empty() {
            return Ok(0);
        }
        let updates = plan_rebalance(&items, self.config.position_scale);
        self.repository.apply_positions(owner_id, &updates).await?;
        info!(%owner_id, count = updates.len(), "rebalanced ranking");
        Ok(updates.len())
    }

    /// Open an interactive placement for a movie the user is about to rate.
    ///
    /// The movie itself is never offered as a comparison candidate. When
    /// there is nothing to compare against the placement resolves at once to
    /// an unbounded pair, which [`submit_rating`](Self::submit_rating) maps to
    /// the category default.
    #[instrument(skip(self))]
    pub async fn start_placement(
        &self,
        owner_id: Uuid,
        external_ref: i64,
        category: RatingCategory,
    ) -> Result<PlacementProgress> {
        Self::validate_external_ref(external_ref)?;

        let state = self.repository.ranking_state(owner_id).await?;
        let total = self.repository.count_items(owner_id).await?;
        self.ensure_can_rate(total, &state)?;

        let candidates = if total < self.config.initial_ranking_threshold {
            Vec::new()
        } else {
            self.repository
                .list_ordered(owner_id)
                .await?
                .into_iter()
                .filter(|item| item.external_ref != external_ref)
                .collect()
        };

        let session = PlacementSession::new(owner_id, external_ref, category, candidates);
        let progress = progress_for(&session)?;
        if matches!(progress, PlacementProgress::Compare { .. }) {
            debug!(session_id = %session.id, candidates = session.candidates.len(), "placement session opened");
            self.sessions.open(session);
        }
        Ok(progress)
    }

    /// Apply one comparison verdict. A resolved session is closed.
    #[instrument(skip(self))]
    pub fn decide_placement(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
        decision: ComparisonDecision,
    ) -> Result<PlacementProgress> {
        let progress = self
            .sessions
            .with_session(owner_id, session_id, |session| {
                session.apply(decision);
                debug!(round = session.state.rounds(), ?decision, "placement round");
                progress_for(session)
            })
            .ok_or_else(|| {
                RankingError::NotFound(format!("Placement session {session_id}"))
            })??;

        if matches!(progress, PlacementProgress::Resolved { .. }) {
            self.sessions.close(owner_id, session_id);
        }
        Ok(progress)
    }

    /// Discard an open placement without storing anything.
    pub fn cancel_placement(&self, owner_id: Uuid, session_id: Uuid) -> Result<()> {
        if self.sessions.close(owner_id, session_id) {
            Ok(())
        } else {
            Err(RankingError::NotFound(format!(
                "Placement session {session_id}"
            )))
        }
    }

    /// One-time manual ordering of the user's first ratings. Positions and
    /// the completion flag are written together.
    #[instrument(skip(self, ordered_ids), fields(count = ordered_ids.len()))]
    pub async fn complete_initial_ranking(
        &self,
        owner_id: Uuid,
        ordered_ids: &[RankedItemId],
    ) -> Result<InitialRankingOutcome> {
        let _guard = self.locks.acquire(owner_id).await;

        let state = self.repository.ranking_state(owner_id).await?;
        if state.has_completed_initial_ranking {
            return Err(RankingError::validation(
                "Initial ranking has already been completed",
            ));
        }

        let items = self.repository.list_ordered(owner_id).await?;
        let threshold = self.config.initial_ranking_threshold;
        if items.len() < threshold {
            return Err(RankingError::Validation(format!(
                "At least {threshold} ratings are required before stack ranking"
            )));
        }

        let plan = plan_initial_ranking(&items, ordered_ids, self.config.position_scale)?;
        let state = self
            .repository
            .complete_initial_ranking(owner_id, &plan.updates)
            .await?;
        info!(
            %owner_id,
            ranked = plan.order.len(),
            appended = plan.appended.len(),
            "initial ranking completed"
        );

        let items = self.repository.list_ordered(owner_id).await?;
        Ok(InitialRankingOutcome {
            state,
            items,
            appended: plan.appended,
        })
    }

    /// The user's list, worst to best.
    pub async fn ordered_items(&self, owner_id: Uuid) -> Result<Vec<RankedItem>> {
        self.repository.list_ordered(owner_id).await
    }

    /// Totals and bootstrap status. While the initial ranking is pending the
    /// first ratings to order are included.
    pub async fn ranking_state(&self, owner_id: Uuid) -> Result<RankingStateView> {
        let state = self.repository.ranking_state(owner_id).await?;
        let total = self.repository.count_items(owner_id).await?;
        let threshold = self.config.initial_ranking_threshold;
        let needs_initial_ranking =
            total >= threshold && !state.has_completed_initial_ranking;

        let initial_items = if needs_initial_ranking {
            let mut items = self.repository.list_ordered(owner_id).await?;
            items.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            items.truncate(threshold);
            Some(items)
        } else {
            None
        };

        Ok(RankingStateView {
            total,
            needs_initial_ranking,
            has_completed_initial_ranking: state.has_completed_initial_ranking,
            initial_items,
        })
    }
}

fn progress_for(session: &PlacementSession) -> Result<PlacementProgress> {
    match session.step() {
        PlacementStep::Compare { index, round } => match session.candidates.get(index) {
            Some(candidate) => Ok(PlacementProgress::Compare {
                session_id: session.id,
                round,
                candidate: candidate.clone(),
            }),
            None => Err(RankingError::Internal(format!(
                "placement session {} asked for candidate {index} of {}",
                session.id,
                session.candidates.len()
            ))),
        },
        PlacementStep::Resolved { insertion_index } => {
            let (before, after) = neighbors(&session.candidates, insertion_index);
            Ok(PlacementProgress::Resolved {
                session_id: session.id,
                placement: Placement {
                    before_id: before.map(|item| item.id),
                    after_id: after.map(|item| item.id),
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;
    use std::time::Duration;

    use cinerank_model::MovieMetadata;

    use super::*;
    use crate::database::infrastructure::memory::InMemoryRankingRepository;
    use crate::providers::MockMovieMetadataProvider;

    fn service() -> RankingService {
        RankingService::new(
            Arc::new(InMemoryRankingRepository::new()),
            None,
            RankingConfig::default(),
        )
    }

    fn rating(owner_id: Uuid, external_ref: i64, category: RatingCategory) -> SubmitRating {
        SubmitRating {
            owner_id,
            external_ref,
            category,
            snapshot: MetadataSnapshot {
                title: Some(format!("Movie {external_ref}")),
                ..MetadataSnapshot::default()
            },
            placement: None,
        }
    }

    async fn seed(service: &RankingService, owner_id: Uuid, count: i64) -> Vec<RankedItem> {
        for n in 0..count {
            service
                .submit_rating(rating(owner_id, 100 + n, RatingCategory::Ok))
                .await
                .unwrap();
        }
        service.ordered_items(owner_id).await.unwrap()
    }

    /// Ten ratings ordered by tmdb id, then the bootstrap.
    async fn bootstrapped(service: &RankingService, owner_id: Uuid) -> Vec<RankedItem> {
        let mut items = seed(service, owner_id, 10).await;
        items.sort_by_key(|item| item.external_ref);
        let ids: Vec<RankedItemId> = items.iter().map(|item| item.id).collect();
        service
            .complete_initial_ranking(owner_id, &ids)
            .await
            .unwrap()
            .items
    }

    #[tokio::test]
    async fn tenth_rating_is_accepted_and_eleventh_requires_ranking() {
        let service = service();
        let owner = Uuid::now_v7();
        seed(&service, owner, 9).await;

        let tenth = service
            .submit_rating(rating(owner, 550, RatingCategory::Great))
            .await
            .unwrap();
        assert_eq!(tenth.resolution, PositionResolution::CategoryDefault);
        assert_eq!(
            tenth.item.position,
            RankingConfig::default().category_defaults.great
        );

        let eleventh = service
            .submit_rating(rating(owner, 551, RatingCategory::Bad))
            .await;
        assert!(matches!(
            eleventh,
            Err(RankingError::RankingRequired { total: 10 })
        ));
    }

    #[tokio::test]
    async fn rerating_updates_the_same_item() {
        let service = service();
        let owner = Uuid::now_v7();

        let first = service
            .submit_rating(rating(owner, 550, RatingCategory::Bad))
            .await
            .unwrap();
        let second = service
            .submit_rating(rating(owner, 550, RatingCategory::Great))
            .await
            .unwrap();

        assert_eq!(first.item.id, second.item.id);
        assert_eq!(second.item.category, RatingCategory::Great);
        assert_eq!(service.ordered_items(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_positive_tmdb_id_is_rejected() {
        let service = service();
        let result = service
            .submit_rating(rating(Uuid::now_v7(), 0, RatingCategory::Ok))
            .await;
        assert!(matches!(result, Err(RankingError::Validation(_))));
    }

    #[tokio::test]
    async fn bootstrap_spaces_ten_items_in_elevenths() {
        let service = service();
        let owner = Uuid::now_v7();
        let items = bootstrapped(&service, owner).await;

        let scale = RankingConfig::default().position_scale;
        for (index, item) in items.iter().enumerate() {
            let expected = (BigDecimal::from(index as u64 + 1) / BigDecimal::from(11)).round(scale);
            assert_eq!(item.position, expected);
            assert_eq!(item.external_ref, 100 + index as i64);
        }

        let state = service.ranking_state(owner).await.unwrap();
        assert!(state.has_completed_initial_ranking);
        assert!(!state.needs_initial_ranking);
        assert!(state.initial_items.is_none());
    }

    #[tokio::test]
    async fn bootstrap_is_rejected_below_threshold_and_after_completion() {
        let service = service();
        let owner = Uuid::now_v7();
        let items = seed(&service, owner, 5).await;
        let ids: Vec<RankedItemId> = items.iter().map(|item| item.id).collect();
        assert!(matches!(
            service.complete_initial_ranking(owner, &ids).await,
            Err(RankingError::Validation(_))
        ));

        let other = Uuid::now_v7();
        let items = bootstrapped(&service, other).await;
        let ids: Vec<RankedItemId> = items.iter().map(|item| item.id).collect();
        assert!(matches!(
            service.complete_initial_ranking(other, &ids).await,
            Err(RankingError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn state_lists_first_ratings_while_ranking_is_pending() {
        let service = service();
        let owner = Uuid::now_v7();
        seed(&service, owner, 10).await;

        let state = service.ranking_state(owner).await.unwrap();
        assert_eq!(state.total, 10);
        assert!(state.needs_initial_ranking);
        let initial = state.initial_items.unwrap();
        let refs: Vec<i64> = initial.iter().map(|item| item.external_ref).collect();
        assert_eq!(refs, (100..110).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn placement_is_required_after_bootstrap() {
        let service = service();
        let owner = Uuid::now_v7();
        bootstrapped(&service, owner).await;

        let result = service
            .submit_rating(rating(owner, 900, RatingCategory::Ok))
            .await;
        assert!(matches!(result, Err(RankingError::Validation(_))));
    }

    #[tokio::test]
    async fn placement_between_neighbors_allocates_midpoint() {
        let service = service();
        let owner = Uuid::now_v7();
        let items = bootstrapped(&service, owner).await;

        let mut request = rating(owner, 900, RatingCategory::Ok);
        request.placement = Some(Placement {
            before_id: Some(items[2].id),
            after_id: Some(items[3].id),
        });
        let outcome = service.submit_rating(request).await.unwrap();

        assert_eq!(outcome.resolution, PositionResolution::Allocated);
        assert!(outcome.item.position > items[2].position);
        assert!(outcome.item.position < items[3].position);

        let ordered = service.ordered_items(owner).await.unwrap();
        assert_eq!(ordered[3].id, outcome.item.id);
    }

    fn assert_distinct_positions(items: &[RankedItem]) {
        let mut seen = HashSet::new();
        for item in items {
            assert!(
                seen.insert(item.position.normalized().to_string()),
                "position {} is shared",
                item.position
            );
        }
    }

    #[tokio::test]
    async fn swapped_neighbors_fall_back_after_rebalance() {
        let service = service();
        let owner = Uuid::now_v7();
        let items = bootstrapped(&service, owner).await;

        let mut request = rating(owner, 900, RatingCategory::Ok);
        request.placement = Some(Placement {
            before_id: Some(items[5].id),
            after_id: Some(items[4].id),
        });
        let outcome = service.submit_rating(request).await.unwrap();

        assert_eq!(outcome.resolution, PositionResolution::Fallback);
        assert!(outcome.rebalanced());
        let expected = items[5].position.clone() + &RankingConfig::default().fallback_epsilon;
        assert_eq!(outcome.item.position, expected);

        let ordered = service.ordered_items(owner).await.unwrap();
        assert_eq!(ordered.len(), 11);
        assert_eq!(ordered[6].id, outcome.item.id);
        assert_distinct_positions(&ordered);
    }

    #[tokio::test]
    async fn unbounded_placement_is_rejected_once_the_list_has_items() {
        let service = service();
        let owner = Uuid::now_v7();
        let items = bootstrapped(&service, owner).await;

        // Lands on 0.5, which the rebalance keeps as the middle of eleven.
        let mut request = rating(owner, 900, RatingCategory::Ok);
        request.placement = Some(Placement {
            before_id: Some(items[4].id),
            after_id: Some(items[5].id),
        });
        let middle = service.submit_rating(request).await.unwrap();
        assert_eq!(middle.item.position, BigDecimal::from_str("0.5").unwrap());
        service.rebalance(owner).await.unwrap();

        let mut request = rating(owner, 901, RatingCategory::Ok);
        request.placement = Some(Placement::default());
        assert!(matches!(
            service.submit_rating(request).await,
            Err(RankingError::Validation(_))
        ));

        let mut request = rating(owner, 902, RatingCategory::Ok);
        request.placement = Some(Placement {
            before_id: Some(RankedItemId::new()),
            after_id: Some(RankedItemId::new()),
        });
        assert!(matches!(
            service.submit_rating(request).await,
            Err(RankingError::Validation(_))
        ));

        let ordered = service.ordered_items(owner).await.unwrap();
        assert_eq!(ordered.len(), 11);
        assert_distinct_positions(&ordered);
    }

    #[tokio::test]
    async fn rerating_above_threshold_moves_the_item() {
        let service = service();
        let owner = Uuid::now_v7();
        let items = bootstrapped(&service, owner).await;
        let moved = &items[2];

        let mut request = rating(owner, moved.external_ref, RatingCategory::Great);
        request.snapshot.title = Some("Movie 102 (Director's Cut)".to_string());
        request.placement = Some(Placement {
            before_id: Some(items[6].id),
            after_id: Some(items[7].id),
        });
        let outcome = service.submit_rating(request).await.unwrap();

        assert_eq!(outcome.resolution, PositionResolution::Allocated);
        assert_eq!(outcome.item.id, moved.id);
        assert_eq!(outcome.item.created_at, moved.created_at);
        assert_eq!(outcome.item.category, RatingCategory::Great);
        assert_eq!(
            outcome.item.cached_title.as_deref(),
            Some("Movie 102 (Director's Cut)")
        );
        assert!(outcome.item.position > items[6].position);
        assert!(outcome.item.position < items[7].position);
        assert_eq!(
            outcome.item.numeric_score,
            score_from_position(&outcome.item.position)
        );

        let ordered = service.ordered_items(owner).await.unwrap();
        assert_eq!(ordered.len(), 10);
        let refs: Vec<i64> = ordered.iter().map(|item| item.external_ref).collect();
        assert_eq!(
            refs,
            vec![100, 101, 103, 104, 105, 106, 102, 107, 108, 109]
        );
        assert_distinct_positions(&ordered);
    }

    #[tokio::test]
    async fn unknown_neighbor_is_treated_as_boundary() {
        let service = service();
        let owner = Uuid::now_v7();
        let items = bootstrapped(&service, owner).await;

        let mut request = rating(owner, 900, RatingCategory::Great);
        request.placement = Some(Placement {
            before_id: Some(items[9].id),
            after_id: Some(RankedItemId::new()),
        });
        let outcome = service.submit_rating(request).await.unwrap();

        assert!(outcome.item.position > items[9].position);
        assert!(outcome.item.position < BigDecimal::from(1));
    }

    #[tokio::test]
    async fn repeated_bottom_insertions_rebalance_before_reaching_zero() {
        let service = service();
        let owner = Uuid::now_v7();
        bootstrapped(&service, owner).await;

        let mut rebalances = 0;
        for n in 0..120 {
            let worst = service.ordered_items(owner).await.unwrap()[0].id;
            let mut request = rating(owner, 1_000 + n, RatingCategory::Bad);
            request.placement = Some(Placement {
                before_id: None,
                after_id: Some(worst),
            });
            let outcome = service.submit_rating(request).await.unwrap();
            if outcome.rebalanced() {
                rebalances += 1;
            }

            let ordered = service.ordered_items(owner).await.unwrap();
            assert_eq!(ordered[0].id, outcome.item.id);
        }
        assert!(rebalances >= 1);

        let ordered = service.ordered_items(owner).await.unwrap();
        assert_eq!(ordered.len(), 130);
        let zero = BigDecimal::from(0);
        assert!(ordered.iter().all(|item| item.position > zero));
        assert_distinct_positions(&ordered);
        let refs: Vec<i64> = ordered.iter().take(3).map(|item| item.external_ref).collect();
        assert_eq!(refs, vec![1_119, 1_118, 1_117]);
    }

    #[tokio::test]
    async fn interactive_placement_matches_decisions() {
        let service = service();
        let owner = Uuid::now_v7();
        bootstrapped(&service, owner).await;

        // The new movie is better than tmdb ids 100..=105 and worse than the rest.
        let mut progress = service
            .start_placement(owner, 900, RatingCategory::Ok)
            .await
            .unwrap();
        let placement = loop {
            match progress {
                PlacementProgress::Compare {
                    session_id,
                    candidate,
                    ..
                } => {
                    let decision = if candidate.external_ref <= 105 {
                        ComparisonDecision::Better
                    } else {
                        ComparisonDecision::Worse
                    };
                    progress = service
                        .decide_placement(owner, session_id, decision)
                        .unwrap();
                }
                PlacementProgress::Resolved { placement, .. } => break placement,
            }
        };
        assert!(service.sessions().is_empty());

        let mut request = rating(owner, 900, RatingCategory::Ok);
        request.placement = Some(placement);
        let outcome = service.submit_rating(request).await.unwrap();

        let ordered = service.ordered_items(owner).await.unwrap();
        let refs: Vec<i64> = ordered.iter().map(|item| item.external_ref).collect();
        assert_eq!(
            refs,
            vec![100, 101, 102, 103, 104, 105, 900, 106, 107, 108, 109]
        );
        assert_eq!(ordered[6].id, outcome.item.id);
    }

    #[tokio::test]
    async fn placement_below_threshold_resolves_without_comparisons() {
        let service = service();
        let owner = Uuid::now_v7();
        seed(&service, owner, 3).await;

        let progress = service
            .start_placement(owner, 900, RatingCategory::Great)
            .await
            .unwrap();
        match progress {
            PlacementProgress::Resolved { placement, .. } => {
                assert!(placement.is_unbounded())
            }
            other => panic!("expected immediate resolution, got {other:?}"),
        }
        assert!(service.sessions().is_empty());
    }

    #[tokio::test]
    async fn rerated_movie_is_not_its_own_candidate() {
        let service = service();
        let owner = Uuid::now_v7();
        bootstrapped(&service, owner).await;

        let mut progress = service
            .start_placement(owner, 104, RatingCategory::Ok)
            .await
            .unwrap();
        while let PlacementProgress::Compare {
            session_id,
            candidate,
            ..
        } = progress
        {
            assert_ne!(candidate.external_ref, 104);
            progress = service
                .decide_placement(owner, session_id, ComparisonDecision::Similar)
                .unwrap();
        }
    }

    #[tokio::test]
    async fn cancelled_session_is_gone() {
        let service = service();
        let owner = Uuid::now_v7();
        bootstrapped(&service, owner).await;

        let PlacementProgress::Compare { session_id, .. } = service
            .start_placement(owner, 900, RatingCategory::Bad)
            .await
            .unwrap()
        else {
            panic!("expected a comparison");
        };

        assert!(matches!(
            service.cancel_placement(Uuid::now_v7(), session_id),
            Err(RankingError::NotFound(_))
        ));
        service.cancel_placement(owner, session_id).unwrap();
        assert!(matches!(
            service.decide_placement(owner, session_id, ComparisonDecision::Better),
            Err(RankingError::NotFound(_))
        ));
        assert_eq!(service.ordered_items(owner).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn missing_title_is_filled_from_the_catalog() {
        let mut provider = MockMovieMetadataProvider::new();
        provider
            .expect_get_movie()
            .withf(|external_ref| *external_ref == 550)
            .times(1)
            .returning(|_| {
                Ok(MovieMetadata {
                    id: 550,
                    title: "Fight Club".to_string(),
                    poster_path: Some("/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg".to_string()),
                    release_date: Some("1999-10-15".to_string()),
                    ..MovieMetadata::default()
                })
            });
        let service = RankingService::new(
            Arc::new(InMemoryRankingRepository::new()),
            Some(Arc::new(provider)),
            RankingConfig::default(),
        );

        let mut request = rating(Uuid::now_v7(), 550, RatingCategory::Great);
        request.snapshot = MetadataSnapshot {
            title: None,
            poster_path: Some("/custom.jpg".to_string()),
            release_date: None,
        };
        let outcome = service.submit_rating(request).await.unwrap();

        assert_eq!(outcome.item.cached_title.as_deref(), Some("Fight Club"));
        assert_eq!(outcome.item.cached_poster_path.as_deref(), Some("/custom.jpg"));
        assert_eq!(outcome.item.cached_release_date.as_deref(), Some("1999-10-15"));
    }

    #[tokio::test]
    async fn catalog_failure_does_not_block_the_rating() {
        let mut provider = MockMovieMetadataProvider::new();
        provider
            .expect_get_movie()
            .returning(|_| Err(ProviderError::RateLimited));
        let service = RankingService::new(
            Arc::new(InMemoryRankingRepository::new()),
            Some(Arc::new(provider)),
            RankingConfig {
                metadata_timeout: Duration::from_millis(200),
                ..RankingConfig::default()
            },
        );

        let mut request = rating(Uuid::now_v7(), 550, RatingCategory::Ok);
        request.snapshot = MetadataSnapshot::default();
        let outcome = service.submit_rating(request).await.unwrap();

        assert!(outcome.item.cached_title.is_none());
    }

    #[tokio::test]
    async fn titled_snapshot_skips_the_catalog() {
        let mut provider = MockMovieMetadataProvider::new();
        provider.expect_get_movie().never();
        let service = RankingService::new(
            Arc::new(InMemoryRankingRepository::new()),
            Some(Arc::new(provider)),
            RankingConfig::default(),
        );

        service
            .submit_rating(rating(Uuid::now_v7(), 550, RatingCategory::Ok))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_ratings_for_one_user_are_serialized() {
        let service = Arc::new(service());
        let owner = Uuid::now_v7();

        let handles: Vec<_> = (0..10)
            .map(|n| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .submit_rating(rating(owner, 500 + n, RatingCategory::Ok))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(matches!(
            service
                .submit_rating(rating(owner, 600, RatingCategory::Ok))
                .await,
            Err(RankingError::RankingRequired { total: 10 })
        ));
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn owner_locks_are_released_after_each_write() {
        let service = service();
        let owners: Vec<Uuid> = (0..25).map(|_| Uuid::now_v7()).collect();
        for owner in &owners {
            service
                .submit_rating(rating(*owner, 550, RatingCategory::Ok))
                .await
                .unwrap();
            service.rebalance(*owner).await.unwrap();
        }
        assert!(service.locks.is_empty());

        let owner = owners[0];
        let items = seed(&service, owner, 9).await;
        let ids: Vec<RankedItemId> = items.iter().map(|item| item.id).collect();
        service.complete_initial_ranking(owner, &ids).await.unwrap();
        assert!(service.locks.is_empty());
    }
}
