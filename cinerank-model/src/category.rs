use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Coarse bucket a user picks when rating a movie.
///
/// Doubles as the default-position group below the ranking threshold and
/// as the seed for the comparison search above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RatingCategory {
    Bad,
    Ok,
    Great,
}

impl RatingCategory {
    pub const ALL: [RatingCategory; 3] =
        [RatingCategory::Bad, RatingCategory::Ok, RatingCategory::Great];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingCategory::Bad => "bad",
            RatingCategory::Ok => "ok",
            RatingCategory::Great => "great",
        }
    }
}

impl Display for RatingCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingCategory {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bad" => Ok(RatingCategory::Bad),
            "ok" => Ok(RatingCategory::Ok),
            "great" => Ok(RatingCategory::Great),
            other => Err(ModelError::InvalidCategory(other.to_string())),
        }
    }
}

/// Outcome of one pairwise comparison between the movie being rated and
/// an already ranked candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ComparisonDecision {
    /// The new movie is preferred over the candidate.
    Better,
    /// The candidate is preferred over the new movie.
    Worse,
    /// No strong preference ("too tough to call").
    #[cfg_attr(feature = "serde", serde(alias = "too_tough"))]
    Similar,
}

impl FromStr for ComparisonDecision {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "better" => Ok(ComparisonDecision::Better),
            "worse" => Ok(ComparisonDecision::Worse),
            "similar" | "too_tough" => Ok(ComparisonDecision::Similar),
            other => Err(ModelError::InvalidDecision(other.to_string())),
        }
    }
}
