use bigdecimal::BigDecimal;
use cinerank_model::{RankedItem, RankedItemId};

use super::score::score_from_position;

/// New position (and the score derived from it) for one ranked item.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub id: RankedItemId,
    pub position: BigDecimal,
    pub numeric_score: f64,
}

impl PositionUpdate {
    pub fn new(id: RankedItemId, position: BigDecimal) -> Self {
        let numeric_score = score_from_position(&position);
        Self {
            id,
            position,
            numeric_score,
        }
    }
}

/// `(index + 1) / (total + 1)`: the evenly spaced slot for zero-based rank
/// `index` in a list of `total` items.
pub fn even_position(index: usize, total: usize, scale: i64) -> BigDecimal {
    let numerator = BigDecimal::from(index as u64 + 1);
    let denominator = BigDecimal::from(total as u64 + 1);
    (numerator / denominator).round(scale)
}

/// Even spacing for an already ordered sequence of ids.
pub fn plan_even_spacing(
    ordered: &[RankedItemId],
    scale: i64,
) -> Vec<PositionUpdate> {
    let total = ordered.len();
    ordered
        .iter()
        .enumerate()
        .map(|(index, id)| {
            PositionUpdate::new(*id, even_position(index, total, scale))
        })
        .collect()
}

/// Re-space a user's whole list across (0, 1) without changing its order.
///
/// The input does not need to be sorted; items are ordered by position with
/// creation time as the tie-break before positions are reassigned.
pub fn plan_rebalance(items: &[RankedItem], scale: i64) -> Vec<PositionUpdate> {
    let mut ordered: Vec<&RankedItem> = items.iter().collect();
    ordered.sort_by(|a, b| a.rank_cmp(b));
    let ids: Vec<RankedItemId> = ordered.iter().map(|item| item.id).collect();
    plan_even_spacing(&ids, scale)
}
