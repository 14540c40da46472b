use std::collections::HashSet;

use cinerank_model::{RankedItem, RankedItemId};

use super::rebalance::{PositionUpdate, plan_even_spacing};
use crate::error::{RankingError, Result};

/// Validated outcome of a user's manual ordering of their first ratings.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialRankingPlan {
    /// Final order, worst to best.
    pub order: Vec<RankedItemId>,
    /// Ids the caller left out, appended at the end in creation order.
    pub appended: Vec<RankedItemId>,
    pub updates: Vec<PositionUpdate>,
}

/// Validate a caller-supplied order against the user's items and compute the
/// evenly spaced positions it implies.
///
/// Unknown or repeated ids are rejected. Ids the caller omitted (ratings that
/// landed while the ordering screen was open) are appended after the supplied
/// order, oldest first.
pub fn plan_initial_ranking(
    items: &[RankedItem],
    ordered_ids: &[RankedItemId],
    scale: i64,
) -> Result<InitialRankingPlan> {
    if ordered_ids.is_empty() {
        return Err(RankingError::validation(
            "Please provide the ordered rating ids",
        ));
    }

    let known: HashSet<RankedItemId> = items.iter().map(|item| item.id).collect();
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !known.contains(id) {
            return Err(RankingError::Validation(format!(
                "Rating {id} does not belong to this user"
            )));
        }
        if !seen.insert(*id) {
            return Err(RankingError::Validation(format!(
                "Rating {id} appears more than once"
            )));
        }
    }

    let mut remaining: Vec<&RankedItem> = items
        .iter()
        .filter(|item| !seen.contains(&item.id))
        .collect();
    remaining.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    let appended: Vec<RankedItemId> = remaining.iter().map(|item| item.id).collect();

    let mut order = ordered_ids.to_vec();
    order.extend(appended.iter().copied());

    let updates = plan_even_spacing(&order, scale);

    Ok(InitialRankingPlan {
        order,
        appended,
        updates,
    })
}
