//! Relative stack ranking.
//!
//! Each user's rated movies form a total order keyed by an arbitrary-precision
//! position in (0, 1). The submodules split the work the same way the rating
//! flow does: [`placement`] narrows down the neighbors of a new movie through
//! pairwise comparisons, [`allocator`] picks a position between those
//! neighbors, [`rebalance`] re-spaces the whole list when there is no room
//! left, and [`bootstrap`] lets a user order their first ratings by hand.

pub mod allocator;
pub mod bootstrap;
pub mod locks;
pub mod placement;
pub mod rebalance;
pub mod score;
pub mod service;
pub mod sessions;

pub use allocator::{AllocationError, PositionAllocator};
pub use bootstrap::{InitialRankingPlan, plan_initial_ranking};
pub use locks::{OwnerGuard, OwnerLocks};
pub use placement::{PlacementState, PlacementStep, max_rounds, seed_index};
pub use rebalance::{PositionUpdate, even_position, plan_rebalance};
pub use score::score_from_position;
pub use service::{
    InitialRankingOutcome, PlacementProgress, PositionResolution, RankingService,
    RankingStateView, RatingOutcome, SubmitRating,
};
pub use sessions::{PlacementSession, PlacementSessions};
