use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::config::RankingConfig;

/// Allocation failure, recovered by the service through a rebalance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// No representable position exists strictly between the two bounds.
    #[error("no room left between {low} and {high}")]
    PositionExhausted { low: BigDecimal, high: BigDecimal },
}

/// Picks a position strictly between two neighbors by midpoint bisection.
#[derive(Debug, Clone)]
pub struct PositionAllocator {
    scale: i64,
}

impl PositionAllocator {
    /// Allocator rounding every position to `scale` fractional digits.
    pub fn new(scale: i64) -> Self {
        Self { scale }
    }

    /// Allocator using the configured position scale.
    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(config.position_scale)
    }

    /// Midpoint of `(low, high)`, where a missing bound is the edge of the
    /// (0, 1) range.
    ///
    /// The result is rounded to the allocator's scale. Once rounding can no
    /// longer produce a value strictly inside the interval the bounds are
    /// reported as exhausted instead of returning a colliding position.
    pub fn allocate(
        &self,
        low: Option<&BigDecimal>,
        high: Option<&BigDecimal>,
    ) -> Result<BigDecimal, AllocationError> {
        let low = low.cloned().unwrap_or_else(|| BigDecimal::from(0));
        let high = high.cloned().unwrap_or_else(|| BigDecimal::from(1));

        if high <= low {
            return Err(AllocationError::PositionExhausted { low, high });
        }

        let midpoint =
            ((&high - &low) / BigDecimal::from(2) + &low).round(self.scale);

        if midpoint <= low || midpoint >= high {
            return Err(AllocationError::PositionExhausted { low, high });
        }

        Ok(midpoint)
    }

    /// Last-resort position used when a rebalance still leaves no room.
    pub fn fallback(
        &self,
        low: Option<&BigDecimal>,
        epsilon: &BigDecimal,
    ) -> BigDecimal {
        let low = low.cloned().unwrap_or_else(|| BigDecimal::from(0));
        (low + epsilon).round(self.scale)
    }
}
