//! Category-seeded binary search over pairwise comparisons.
//!
//! [`PlacementState`] is a pure state machine over the indices of a user's
//! existing items sorted worst to best. Each decision narrows `[low, high]`
//! until the range is empty; the insertion index is then `low`, and the new
//! item belongs between `items[low - 1]` and `items[low]`.

use cinerank_model::{ComparisonDecision, RatingCategory};

/// Output of the placement search after each verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStep {
    /// Compare the new movie against the item at `index`.
    Compare { index: usize, round: u32 },
    /// Search finished; the new movie is inserted before `insertion_index`.
    Resolved { insertion_index: usize },
}

/// Binary search bounds over a list of `total` candidates, worst to best.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementState {
    low: isize,
    high: isize,
    current_index: usize,
    total: usize,
    rounds: u32,
    resolved: Option<usize>,
}

impl PlacementState {
    /// Start a search among `total` existing items for a movie the user put
    /// in `category`.
    pub fn new(category: RatingCategory, total: usize) -> Self {
        Self {
            low: 0,
            high: total as isize - 1,
            current_index: seed_index(category, total),
            total,
            rounds: 0,
            resolved: (total == 0).then_some(0),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// What the caller should do next.
    pub fn step(&self) -> PlacementStep {
        match self.resolved {
            Some(insertion_index) => PlacementStep::Resolved { insertion_index },
            None => PlacementStep::Compare {
                index: self.current_index,
                round: self.rounds + 1,
            },
        }
    }

    /// Apply the user's verdict on the current candidate.
    ///
    /// Decisions after the search has resolved are ignored.
    pub fn apply(&mut self, decision: ComparisonDecision) -> PlacementStep {
        if self.resolved.is_some() {
            return self.step();
        }

        let current = self.current_index as isize;
        let prefer_new = match decision {
            ComparisonDecision::Better => true,
            ComparisonDecision::Worse => false,
            // Collapse the smaller side so an undecided user still converges.
            ComparisonDecision::Similar => current - self.low > self.high - current,
        };

        if prefer_new {
            self.low = current + 1;
        } else {
            self.high = current - 1;
        }
        self.rounds += 1;

        if self.low > self.high {
            self.resolved = Some(self.low as usize);
        } else {
            self.current_index = ((self.low + self.high) / 2) as usize;
        }

        self.step()
    }
}

/// Starting index for the first comparison.
///
/// The sorted list is split into three contiguous thirds (remainder slots go
/// to the bad third, then the ok third) and the search starts at the middle
/// of the third matching the user's coarse category.
pub fn seed_index(category: RatingCategory, total: usize) -> usize {
    if total == 0 {
        return 0;
    }

    let base = total / 3;
    let remainder = total % 3;
    let size_bad = base + usize::from(remainder > 0);
    let size_ok = base + usize::from(remainder > 1);
    let size_great = total - size_bad - size_ok;

    let (start, size) = match category {
        RatingCategory::Bad => (0, size_bad),
        RatingCategory::Ok => (size_bad, size_ok),
        RatingCategory::Great => (size_bad + size_ok, size_great),
    };

    if size == 0 {
        return total / 2;
    }
    (start + (start + size - 1)) / 2
}

/// Upper bound on comparisons needed to place an item among `total` others.
pub fn max_rounds(total: usize) -> u32 {
    if total <= 1 {
        return total as u32;
    }
    (usize::BITS - (total - 1).leading_zeros()) + 1
}

/// Neighbors on either side of an insertion index.
pub fn neighbors<T>(items: &[T], insertion_index: usize) -> (Option<&T>, Option<&T>) {
    let before = insertion_index
        .checked_sub(1)
        .and_then(|index| items.get(index));
    let after = items.get(insertion_index);
    (before, after)
}
