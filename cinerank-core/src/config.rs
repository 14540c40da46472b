//! Ranking tunables.
//!
//! These never change at runtime; a single [`RankingConfig`] value is built at
//! startup and handed to the allocator, the placement search and the service.

use std::time::Duration;

use bigdecimal::BigDecimal;
use cinerank_model::RatingCategory;

use crate::error::{RankingError, Result};

/// Number of fractional digits the `ranked_items.position` column keeps.
pub const MAX_POSITION_SCALE: i64 = 30;

/// Default positions handed out below the ranking threshold, one per category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDefaults {
    pub bad: BigDecimal,
    pub ok: BigDecimal,
    pub great: BigDecimal,
}

impl CategoryDefaults {
    /// Configured default for `category`, before rounding to the position scale.
    pub fn position_for(&self, category: RatingCategory) -> &BigDecimal {
        match category {
            RatingCategory::Bad => &self.bad,
            RatingCategory::Ok => &self.ok,
            RatingCategory::Great => &self.great,
        }
    }
}

impl Default for CategoryDefaults {
    fn default() -> Self {
        Self {
            bad: BigDecimal::new(1_666_666_667.into(), 10),
            ok: BigDecimal::new(5.into(), 1),
            great: BigDecimal::new(8_333_333_333_i64.into(), 10),
        }
    }
}

/// Tunables for allocation, placement and the initial ranking gate.
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// Ratings a user may add before the initial bulk ranking is required.
    pub initial_ranking_threshold: usize,
    pub category_defaults: CategoryDefaults,
    /// Fractional digits kept for every computed position.
    pub position_scale: i64,
    /// Offset added to the lower bound when a rebalance still leaves no room.
    pub fallback_epsilon: BigDecimal,
    /// Idle lifetime of an interactive placement session.
    pub placement_session_ttl: Duration,
    /// Upper bound on a catalog lookup made while submitting a rating.
    pub metadata_timeout: Duration,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            initial_ranking_threshold: 10,
            category_defaults: CategoryDefaults::default(),
            position_scale: MAX_POSITION_SCALE,
            fallback_epsilon: BigDecimal::new(1.into(), 28),
            placement_session_ttl: Duration::from_secs(15 * 60),
            metadata_timeout: Duration::from_secs(3),
        }
    }
}

impl RankingConfig {
    /// Reject settings the allocator cannot honor, such as a scale past the
    /// column's precision or an epsilon smaller than one unit of that scale.
    pub fn validate(&self) -> Result<()> {
        if self.initial_ranking_threshold == 0 {
            return Err(RankingError::validation(
                "initial ranking threshold must be at least 1",
            ));
        }
        if !(1..=MAX_POSITION_SCALE).contains(&self.position_scale) {
            return Err(RankingError::Validation(format!(
                "position scale must be between 1 and {MAX_POSITION_SCALE}"
            )));
        }

        let zero = BigDecimal::from(0);
        let one = BigDecimal::from(1);
        let floor = BigDecimal::new(1.into(), self.position_scale);
        if self.fallback_epsilon < floor || self.fallback_epsilon >= one {
            return Err(RankingError::Validation(format!(
                "fallback epsilon must lie in [{floor}, 1)"
            )));
        }

        for category in RatingCategory::ALL {
            let position = self.category_defaults.position_for(category);
            if *position <= zero || *position >= one {
                return Err(RankingError::Validation(format!(
                    "default position for {category} must lie strictly between 0 and 1"
                )));
            }
        }
        let defaults = &self.category_defaults;
        if !(defaults.bad < defaults.ok && defaults.ok < defaults.great) {
            return Err(RankingError::validation(
                "default positions must increase from bad to great",
            ));
        }

        Ok(())
    }
}
